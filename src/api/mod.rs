// ==========================================
// 齐套作业排产系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供宿主进程调用
// 约定: 每个写操作校验输入、记录日志并发布一条事件
// ==========================================

pub mod calendar_api;
pub mod config_api;
pub mod error;
pub mod job_api;
pub mod repositories;
pub mod scenario_api;
pub mod shift_api;

// 重导出核心类型
pub use calendar_api::{CalendarApi, CalendarView};
pub use config_api::{ConfigApi, ConfigItem};
pub use error::{ApiError, ApiResult};
pub use job_api::{JobApi, NewDelayRequest};
pub use repositories::ScheduleRepositories;
pub use scenario_api::ScenarioApi;
pub use shift_api::ShiftApi;
