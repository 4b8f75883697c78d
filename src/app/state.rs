// ==========================================
// 齐套作业排产系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约定: 所有 Repository 共享同一个 SQLite 连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::error::{ApiError, ApiResult};
use crate::api::{CalendarApi, ConfigApi, JobApi, ScenarioApi, ScheduleRepositories, ShiftApi};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::events::{InMemoryEventBus, OptionalEventPublisher};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "KITTING_APS_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享仓储集合
    pub repos: ScheduleRepositories,

    /// 进程内事件总线 (多窗口刷新订阅)
    pub event_bus: Arc<InMemoryEventBus>,

    pub shift_api: Arc<ShiftApi>,
    pub job_api: Arc<JobApi>,
    pub scenario_api: Arc<ScenarioApi>,
    pub calendar_api: Arc<CalendarApi>,
    pub config_api: Arc<ConfigApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 打开数据库、建表，然后装配 Repository 与 API
    pub fn new(db_path: String) -> ApiResult<Self> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("无法打开数据库: {}", e)))?;
        init_schema(&conn)
            .map_err(|e| ApiError::DatabaseError(format!("数据库建表失败: {}", e)))?;

        Ok(Self::from_connection(db_path, Arc::new(Mutex::new(conn))))
    }

    /// 基于已初始化的连接装配
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Self {
        let repos = ScheduleRepositories::from_connection(conn);

        let event_bus = Arc::new(InMemoryEventBus::new());
        let events = OptionalEventPublisher::with_publisher(event_bus.clone());

        let shift_api = Arc::new(ShiftApi::new(repos.clone(), events.clone()));
        let job_api = Arc::new(JobApi::new(repos.clone(), events.clone()));
        let scenario_api = Arc::new(ScenarioApi::new(repos.clone(), events.clone()));
        let calendar_api = Arc::new(CalendarApi::new(repos.clone()));
        let config_api = Arc::new(ConfigApi::new(repos.config.clone(), events));

        tracing::info!("AppState初始化完成");
        Self {
            db_path,
            repos,
            event_bus,
            shift_api,
            job_api,
            scenario_api,
            calendar_api,
            config_api,
        }
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 `KITTING_APS_DB_PATH`，
/// 否则为 `<data_local_dir>/kitting-aps/kitting_aps.db`
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./kitting_aps.db");
    if let Some(data_dir) = dirs::data_local_dir() {
        let dir = data_dir.join("kitting-aps");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("kitting_aps.db");
        }
    }

    path.to_string_lossy().to_string()
}
