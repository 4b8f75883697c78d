// ==========================================
// 齐套作业排产系统 - 作业领域模型
// ==========================================
// 作业 = 有序工艺路线步骤 × 订单数量 + 一次性准备/收尾时间
// 红线: expected_kit_duration / expected_job_duration 为派生字段,
//       任何输入字段变化后必须重算 (见 engine::station)
// ==========================================

use crate::domain::delay::DelayStep;
use crate::domain::shift::option_hhmm;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// RouteStep - 工艺路线步骤 (单件)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub name: String,
    pub expected_seconds: i64,
    pub order: u32,
}

impl RouteStep {
    pub fn new(name: impl Into<String>, expected_seconds: i64, order: u32) -> Self {
        Self {
            name: name.into(),
            expected_seconds,
            order,
        }
    }
}

// ==========================================
// ScheduleStep - 展开后的执行步骤
// ==========================================
// 真实工序与插入的延误步骤显式区分: 延误只计时，不作为真实工作执行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleStep {
    Real(RouteStep),
    Delay(DelayStep),
}

impl ScheduleStep {
    pub fn order(&self) -> u32 {
        match self {
            ScheduleStep::Real(step) => step.order,
            ScheduleStep::Delay(step) => step.order,
        }
    }

    pub fn set_order(&mut self, order: u32) {
        match self {
            ScheduleStep::Real(step) => step.order = order,
            ScheduleStep::Delay(step) => step.order = order,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ScheduleStep::Real(step) => &step.name,
            ScheduleStep::Delay(step) => &step.name,
        }
    }

    /// 该步骤占用的秒数
    pub fn seconds(&self) -> i64 {
        match self {
            ScheduleStep::Real(step) => step.expected_seconds,
            ScheduleStep::Delay(step) => step.duration_seconds,
        }
    }

    pub fn is_delay(&self) -> bool {
        matches!(self, ScheduleStep::Delay(_))
    }
}

// ==========================================
// Job - 作业
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    // ===== 标识 (仅显示，不参与排产) =====
    pub id: String,
    pub job_number: String,
    pub customer: String,
    pub description: String,

    // ===== 工作量 =====
    pub ordered_quantity: u32,
    pub route_steps: Vec<RouteStep>,
    pub setup: i64,       // 准备 (秒)
    pub make_ready: i64,  // 调机 (秒)
    pub take_down: i64,   // 收尾 (秒)
    pub station_count: u32, // 并行工位数

    // ===== 排产锚点与约束 =====
    pub scheduled_date: Option<NaiveDate>,
    #[serde(with = "option_hhmm")]
    pub scheduled_start_time: Option<NaiveTime>,
    pub allowed_shift_ids: Vec<String>, // 空 = 所有全局启用班次
    pub include_weekends: bool,

    // ===== 派生字段 =====
    pub expected_kit_duration: i64, // 单件时长 = Σ 步骤秒数
    pub expected_job_duration: i64, // 总工作秒数
}

impl Default for Job {
    fn default() -> Self {
        Self {
            id: String::new(),
            job_number: String::new(),
            customer: String::new(),
            description: String::new(),
            ordered_quantity: 1,
            route_steps: Vec::new(),
            setup: 0,
            make_ready: 0,
            take_down: 0,
            station_count: 1,
            scheduled_date: None,
            scheduled_start_time: None,
            allowed_shift_ids: Vec::new(),
            include_weekends: false,
            expected_kit_duration: 0,
            expected_job_duration: 0,
        }
    }
}

impl Job {
    /// 创建空作业（派生字段为 0，需由调用方重算）
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// 排产起点 (日期 + 开始时刻，时刻缺省为 00:00)
    pub fn scheduled_start(&self) -> Option<NaiveDateTime> {
        let date = self.scheduled_date?;
        match self.scheduled_start_time {
            Some(time) => Some(date.and_time(time)),
            None => date.and_hms_opt(0, 0, 0),
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_date.is_some()
    }

    /// 按 order 排序后的工艺路线
    pub fn sorted_route_steps(&self) -> Vec<RouteStep> {
        let mut steps = self.route_steps.clone();
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// 作业是否依赖某个班次（空白名单 = 依赖全部全局启用班次）
    pub fn depends_on_shift(&self, shift_id: &str) -> bool {
        self.allowed_shift_ids.is_empty() || self.allowed_shift_ids.iter().any(|id| id == shift_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_payload_deserializes_with_defaults() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "J1",
            "ordered_quantity": 5,
            "scheduled_date": "2024-03-04",
            "scheduled_start_time": "07:00"
        }))
        .unwrap();

        assert_eq!(job.station_count, 1);
        assert!(job.route_steps.is_empty());
        assert_eq!(
            job.scheduled_start(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(7, 0, 0)
        );
    }

    #[test]
    fn test_depends_on_shift() {
        let mut job = Job::new("J1");
        assert!(job.depends_on_shift("S1"));
        job.allowed_shift_ids = vec!["S2".to_string()];
        assert!(!job.depends_on_shift("S1"));
        assert!(job.depends_on_shift("S2"));
    }

    #[test]
    fn test_schedule_step_tagged_serialization() {
        let step = ScheduleStep::Real(RouteStep::new("拣料", 30, 1));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["kind"], "real");
        assert_eq!(json["expected_seconds"], 30);
        assert!(!step.is_delay());
    }
}
