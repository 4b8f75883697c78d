// ==========================================
// 齐套作业排产系统 - 日历展示模型
// ==========================================
// 日历 UI 每天一个格子: 多日作业拆成按日的片段
// 拖动任一片段 = 移动整个作业 (片段全部重新派生)
// ==========================================

use crate::domain::job::ScheduleStep;
use crate::domain::scenario::OverlayAnnotation;
use crate::domain::shift::hhmm;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// 片段ID中作业ID与日序号的分隔符
pub const SEGMENT_ID_SEPARATOR: &str = "#day";

// ==========================================
// DaySegment - 日片段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySegment {
    pub segment_id: String,   // {job_id}#day{index}
    pub job_id: String,
    pub day_index: u32,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub display_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub display_end: NaiveTime,
    pub is_first_day: bool,
    pub is_last_day: bool,
    pub productive_seconds: i64, // 当日实际消耗的有效工作秒数
}

/// 生成片段ID
pub fn segment_id(job_id: &str, day_index: u32) -> String {
    format!("{}{}{}", job_id, SEGMENT_ID_SEPARATOR, day_index)
}

/// 片段ID -> (作业ID, 日序号)
pub fn parse_segment_id(segment_id: &str) -> Option<(String, u32)> {
    let (job_id, index) = segment_id.rsplit_once(SEGMENT_ID_SEPARATOR)?;
    if job_id.is_empty() {
        return None;
    }
    let day_index = index.parse().ok()?;
    Some((job_id.to_string(), day_index))
}

// ==========================================
// JobCalendar - 单个作业的日历条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCalendar {
    pub job_id: String,
    pub start: NaiveDateTime,  // 推进到首个可工作时刻后的起点
    pub end: NaiveDateTime,
    pub duration_seconds: i64, // 含延误
    pub continuous_fallback: bool, // 无可用班次时按 24/7 计算
    pub steps: Vec<ScheduleStep>,
    pub segments: Vec<DaySegment>,
    pub annotation: Option<OverlayAnnotation>,
}
