// ==========================================
// 齐套作业排产系统 - 班次领域模型
// ==========================================
// 班次: 每日重复的工作时间窗，可含一段内部休息
// 约定: end_time <= start_time 表示跨夜班次（次日结束）
// 红线: 跨夜只在计算时 +24h 归一化，绝不修改存储的时间
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 一天的秒数
pub const SECONDS_PER_DAY: i64 = 86_400;

/// 时间字符串格式错误（配置错误，不做自动修正）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("无效的时间格式 (期望 HH:MM): {input}")]
pub struct InvalidTimeError {
    pub input: String,
}

/// 解析 "HH:MM" 时间字符串（分钟精度）
pub fn parse_hhmm(input: &str) -> Result<NaiveTime, InvalidTimeError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| InvalidTimeError {
        input: input.to_string(),
    })
}

/// 格式化为 "HH:MM"
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// 一天内的秒数偏移
pub(crate) fn seconds_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

/// serde 辅助: NaiveTime <-> "HH:MM"
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}

/// serde 辅助: Option<NaiveTime> <-> "HH:MM" | null
pub mod option_hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_some(&super::format_hhmm(*t)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            Some(s) if !s.trim().is_empty() => super::parse_hhmm(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

// ==========================================
// Shift - 班次
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub name: String,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default, with = "option_hhmm")]
    pub break_start: Option<NaiveTime>,
    #[serde(default)]
    pub break_duration_min: Option<u32>,
    pub is_active: bool,
    pub order: i32,               // 显示/迭代优先级
    #[serde(default)]
    pub color: Option<String>,    // 仅用于显示
}

impl Shift {
    /// 创建启用状态、无休息的班次
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start: &str,
        end: &str,
    ) -> Result<Self, InvalidTimeError> {
        Ok(Self {
            id: id.into(),
            name: name.into(),
            start_time: parse_hhmm(start)?,
            end_time: parse_hhmm(end)?,
            break_start: None,
            break_duration_min: None,
            is_active: true,
            order: 0,
            color: None,
        })
    }

    /// 设置休息窗口
    pub fn with_break(mut self, start: &str, minutes: u32) -> Result<Self, InvalidTimeError> {
        self.break_start = Some(parse_hhmm(start)?);
        self.break_duration_min = Some(minutes);
        Ok(self)
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// 是否跨夜
    pub fn is_overnight(&self) -> bool {
        self.end_time <= self.start_time
    }

    /// 班次总跨度（秒），跨夜时 end +24h
    pub fn span_seconds(&self) -> i64 {
        let start = seconds_of_day(self.start_time);
        let end = seconds_of_day(self.end_time);
        if end <= start {
            end + SECONDS_PER_DAY - start
        } else {
            end - start
        }
    }

    /// 配置的休息时长（秒）
    pub fn break_seconds(&self) -> i64 {
        match (self.break_start, self.break_duration_min) {
            (Some(_), Some(minutes)) => i64::from(minutes) * 60,
            _ => 0,
        }
    }

    /// 休息窗口相对班次开始的偏移 (offset, len)
    ///
    /// 休息起点落在班次跨度之外时返回 None；休息超出班次末尾的部分被截断
    pub fn break_window(&self) -> Option<(i64, i64)> {
        let break_start = self.break_start?;
        let len = self.break_seconds();
        if len == 0 {
            return None;
        }
        let span = self.span_seconds();
        let offset = (seconds_of_day(break_start) - seconds_of_day(self.start_time))
            .rem_euclid(SECONDS_PER_DAY);
        if offset >= span {
            return None;
        }
        Some((offset, len.min(span - offset)))
    }

    /// 有效工作秒数 = 跨度 - 休息
    pub fn productive_seconds(&self) -> i64 {
        let break_len = self.break_window().map(|(_, len)| len).unwrap_or(0);
        self.span_seconds() - break_len
    }

    /// 有效工时（小时）
    pub fn productive_hours(&self) -> f64 {
        self.productive_seconds() as f64 / 3600.0
    }

    /// 时刻 (一天内) 是否落在班次内且不在休息中
    pub fn contains_time(&self, time: NaiveTime) -> bool {
        let offset =
            (seconds_of_day(time) - seconds_of_day(self.start_time)).rem_euclid(SECONDS_PER_DAY);
        if offset >= self.span_seconds() {
            return false;
        }
        match self.break_window() {
            Some((b_off, b_len)) => !(offset >= b_off && offset < b_off + b_len),
            None => true,
        }
    }

    /// 时刻是否落在休息窗口内
    pub fn in_break(&self, time: NaiveTime) -> bool {
        let offset =
            (seconds_of_day(time) - seconds_of_day(self.start_time)).rem_euclid(SECONDS_PER_DAY);
        match self.break_window() {
            Some((b_off, b_len)) => offset >= b_off && offset < b_off + b_len,
            None => false,
        }
    }

    /// 某日开班的实例中，连续不中断的工作子窗口 [start, end)
    ///
    /// 跨夜班次的子窗口会延伸到次日
    pub fn productive_windows_on(&self, day: NaiveDate) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let start = day.and_time(self.start_time);
        let end = start + Duration::seconds(self.span_seconds());

        match self.break_window() {
            Some((offset, len)) => {
                let break_from = start + Duration::seconds(offset);
                let break_to = break_from + Duration::seconds(len);
                let mut windows = Vec::with_capacity(2);
                if break_from > start {
                    windows.push((start, break_from));
                }
                if end > break_to {
                    windows.push((break_to, end));
                }
                windows
            }
            None => vec![(start, end)],
        }
    }
}
