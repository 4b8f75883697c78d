// ==========================================
// 齐套作业排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod calendar;
pub mod delay;
pub mod job;
pub mod scenario;
pub mod shift;
pub mod types;

// 重导出核心类型
pub use calendar::{parse_segment_id, segment_id, DaySegment, JobCalendar};
pub use delay::{DelayStep, JobDelay};
pub use job::{Job, RouteStep, ScheduleStep};
pub use scenario::{
    JobPatch, NewScenarioChange, OverlayAnnotation, OverlayJob, Scenario, ScenarioChange,
};
pub use shift::{parse_hhmm, InvalidTimeError, Shift};
pub use types::{ChangeOperation, OverlayStatus, ScenarioState};
