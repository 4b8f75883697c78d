// ==========================================
// 齐套作业排产系统 - 日历视图 API
// ==========================================
// 职责: 组装生产视图/情景视图的作业日历 (按日片段)
// 规则: 日历总是由作业锚点与当前班次派生，从不持久化
// ==========================================

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::repositories::ScheduleRepositories;
use crate::domain::calendar::JobCalendar;
use crate::domain::scenario::Scenario;

/// 日历视图 (一次渲染所需的全部作业日历)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarView {
    pub scenario: Option<Scenario>, // None = 生产视图
    pub calendars: Vec<JobCalendar>,
}

impl CalendarView {
    pub fn is_production(&self) -> bool {
        self.scenario.is_none()
    }

    pub fn find(&self, job_id: &str) -> Option<&JobCalendar> {
        self.calendars.iter().find(|c| c.job_id == job_id)
    }
}

// ==========================================
// CalendarApi - 日历视图 API
// ==========================================
pub struct CalendarApi {
    repos: ScheduleRepositories,
}

impl CalendarApi {
    pub fn new(repos: ScheduleRepositories) -> Self {
        Self { repos }
    }

    /// 生产视图日历
    pub fn production_calendar(&self) -> ApiResult<CalendarView> {
        let overlays = self.repos.production_overlay()?;
        let shifts = self.repos.shift_repo.list_all()?;
        let calendars = self.repos.calendar_builder()?.build_all(&overlays, &shifts)?;

        tracing::debug!(jobs = calendars.len(), "生产视图日历已生成");
        Ok(CalendarView {
            scenario: None,
            calendars,
        })
    }

    /// 指定情景的叠加视图日历 (含幽灵渲染的已删除作业)
    pub fn scenario_calendar(&self, scenario_id: &str) -> ApiResult<CalendarView> {
        let (scenario, overlays) = self.repos.scenario_overlay(scenario_id)?;
        let shifts = self.repos.shift_repo.list_all()?;
        let calendars = self.repos.calendar_builder()?.build_all(&overlays, &shifts)?;

        tracing::debug!(
            scenario_id = %scenario.id,
            jobs = calendars.len(),
            "情景视图日历已生成"
        );
        Ok(CalendarView {
            scenario: Some(scenario),
            calendars,
        })
    }

    /// 当前视图: 有激活情景时显示情景叠加，否则显示生产
    pub fn active_calendar(&self) -> ApiResult<CalendarView> {
        match self.repos.scenario_repo.find_active()? {
            Some(scenario) => self.scenario_calendar(&scenario.id),
            None => self.production_calendar(),
        }
    }

    /// 当前视图下单个作业的日历
    pub fn job_calendar(&self, job_id: &str) -> ApiResult<JobCalendar> {
        let view = self.active_calendar()?;
        view.calendars
            .into_iter()
            .find(|c| c.job_id == job_id)
            .ok_or_else(|| ApiError::NotFound(format!("作业{}无日历 (不存在或未排产)", job_id)))
    }
}
