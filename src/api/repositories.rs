// ==========================================
// 齐套作业排产系统 - API层仓储聚合
// ==========================================
// 职责: 聚合各 API 共用的 Repository 与配置，并提供
//       "加载生产视图/情景视图" 这类跨仓储的读取组合
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::scenario::{OverlayJob, Scenario};
use crate::engine::calendar_builder::CalendarBuilder;
use crate::engine::scenario_diff::{compute_overlay, expand_production};
use crate::repository::{DelayRepository, JobRepository, ScenarioRepository, ShiftRepository};

/// 排产仓储集合
///
/// # 包含的仓储
/// - `shift_repo`: 班次
/// - `job_repo`: 作业
/// - `scenario_repo`: 情景与变更
/// - `delay_repo`: 延误
/// - `config`: 配置 (排产引擎参数)
#[derive(Clone)]
pub struct ScheduleRepositories {
    pub shift_repo: Arc<ShiftRepository>,
    pub job_repo: Arc<JobRepository>,
    pub scenario_repo: Arc<ScenarioRepository>,
    pub delay_repo: Arc<DelayRepository>,
    pub config: Arc<ConfigManager>,
}

impl ScheduleRepositories {
    /// 基于同一个共享连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            shift_repo: Arc::new(ShiftRepository::from_connection(conn.clone())),
            job_repo: Arc::new(JobRepository::from_connection(conn.clone())),
            scenario_repo: Arc::new(ScenarioRepository::from_connection(conn.clone())),
            delay_repo: Arc::new(DelayRepository::from_connection(conn.clone())),
            config: Arc::new(ConfigManager::from_connection(conn)),
        }
    }

    /// 按当前配置构造日历组装器
    pub fn calendar_builder(&self) -> ApiResult<CalendarBuilder> {
        Ok(CalendarBuilder::new(self.config.scheduler_config()?))
    }

    /// 生产视图: 真实作业 + 生产延误
    pub fn production_overlay(&self) -> ApiResult<Vec<OverlayJob>> {
        let jobs = self.job_repo.list_all()?;
        let delays = self.delay_repo.list_production()?;
        Ok(expand_production(&jobs, &delays))
    }

    /// 情景视图: 真实作业 + 情景变更 + 生产延误 + 情景延误
    pub fn scenario_overlay(&self, scenario_id: &str) -> ApiResult<(Scenario, Vec<OverlayJob>)> {
        let scenario = self.require_scenario(scenario_id)?;
        let jobs = self.job_repo.list_all()?;
        let changes = self.scenario_repo.list_changes(scenario_id)?;
        let delays = self.delay_repo.list_visible_in(scenario_id)?;
        let overlay = compute_overlay(&jobs, &scenario, &changes, &delays);
        Ok((scenario, overlay))
    }

    pub fn require_scenario(&self, scenario_id: &str) -> ApiResult<Scenario> {
        if scenario_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("情景ID不能为空".to_string()));
        }
        self.scenario_repo
            .find_by_id(scenario_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Scenario(id={})不存在", scenario_id)))
    }
}
