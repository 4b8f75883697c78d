// ==========================================
// 齐套作业排产系统 - 应用层
// ==========================================
// 职责: 装配共享状态，供宿主进程 (桌面壳/服务) 调用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
