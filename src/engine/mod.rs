// ==========================================
// 齐套作业排产系统 - 引擎层
// ==========================================
// 职责: 班次感知排产、日片段拆分、延误注入、情景叠加/提交回放
// 红线: Engine 不拼 SQL, 通过 JobStore trait 访问真实作业存储
// 红线: 除回放外全部为纯函数, 无 I/O
// ==========================================

pub mod calendar_builder;
pub mod cascade;
pub mod day_segment;
pub mod delay_injection;
pub mod error;
pub mod events;
pub mod job_patch;
pub mod scenario_diff;
pub mod scheduler;
pub mod shift_calendar;
pub mod station;

// 重导出核心引擎
pub use calendar_builder::{CalendarBuilder, ScheduleDelta};
pub use cascade::{cascade_shift_change, CascadeFailure, ShiftCascade};
pub use day_segment::DaySegmenter;
pub use delay_injection::{apply_delays, ExpandedJob};
pub use error::{EngineError, EngineResult};
pub use events::{
    InMemoryEventBus, NoOpEventPublisher, OptionalEventPublisher, ScheduleEvent,
    ScheduleEventPublisher, ScheduleEventType,
};
pub use scenario_diff::{compute_overlay, replay_changes, CommitSummary, JobStore};
pub use scheduler::{ForwardSchedule, ForwardScheduler, SchedulerConfig, WorkInterval};
pub use shift_calendar::{is_weekend, productive_hours, shift_containing, ScheduleOptions};
