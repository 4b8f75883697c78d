// ==========================================
// 齐套作业排产系统 - 班次管理 API
// ==========================================
// 职责: 班次增删改查、启停
// 规则: 写入前校验 (有效工时 > 0，休息完整落在班次内)
// 规则: 启停/修改后对依赖作业做级联重算并发布 ShiftChanged 事件，
//       作业存储的排产锚点不变
// 规则: 班次写入已生效时，个别作业重算失败只记入 ShiftCascade.failures
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::repositories::ScheduleRepositories;
use crate::domain::shift::Shift;
use crate::engine::cascade::{cascade_shift_change, ShiftCascade};
use crate::engine::events::{OptionalEventPublisher, ScheduleEvent, ScheduleEventType};
use crate::engine::shift_calendar::validate_shift;

const EVENT_SOURCE: &str = "ShiftApi";

// ==========================================
// ShiftApi - 班次管理 API
// ==========================================
pub struct ShiftApi {
    repos: ScheduleRepositories,
    events: OptionalEventPublisher,
}

impl ShiftApi {
    pub fn new(repos: ScheduleRepositories, events: OptionalEventPublisher) -> Self {
        Self { repos, events }
    }

    /// 全部班次 (按 order 排序)
    pub fn list_shifts(&self) -> ApiResult<Vec<Shift>> {
        Ok(self.repos.shift_repo.list_all()?)
    }

    pub fn get_shift(&self, shift_id: &str) -> ApiResult<Shift> {
        self.repos
            .shift_repo
            .find_by_id(shift_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Shift(id={})不存在", shift_id)))
    }

    /// 新建班次；id 为空时自动生成
    pub fn create_shift(&self, mut shift: Shift) -> ApiResult<Shift> {
        if shift.id.trim().is_empty() {
            shift.id = uuid::Uuid::new_v4().to_string();
        }
        if shift.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("班次名称不能为空".to_string()));
        }
        validate_shift(&shift)?;

        self.repos.shift_repo.insert(&shift)?;
        tracing::info!(shift_id = %shift.id, name = %shift.name, "班次已创建");

        self.events.publish(ScheduleEvent::full_scope(
            ScheduleEventType::ShiftChanged,
            Some(EVENT_SOURCE.to_string()),
        ));
        Ok(shift)
    }

    /// 修改班次并级联重算依赖作业
    pub fn update_shift(&self, shift: Shift) -> ApiResult<ShiftCascade> {
        validate_shift(&shift)?;
        self.repos.shift_repo.update(&shift)?;
        tracing::info!(shift_id = %shift.id, "班次已修改");
        self.cascade(&shift.id)
    }

    /// 启用/停用班次并级联重算依赖作业
    pub fn set_shift_active(&self, shift_id: &str, is_active: bool) -> ApiResult<ShiftCascade> {
        self.repos.shift_repo.set_active(shift_id, is_active)?;
        tracing::info!(shift_id = %shift_id, is_active, "班次启停状态已切换");
        self.cascade(shift_id)
    }

    pub fn delete_shift(&self, shift_id: &str) -> ApiResult<ShiftCascade> {
        if !self.repos.shift_repo.delete(shift_id)? {
            return Err(ApiError::NotFound(format!("Shift(id={})不存在", shift_id)));
        }
        tracing::info!(shift_id = %shift_id, "班次已删除");
        self.cascade(shift_id)
    }

    /// 班次有效工时（小时）
    pub fn productive_hours(&self, shift_id: &str) -> ApiResult<f64> {
        Ok(self.get_shift(shift_id)?.productive_hours())
    }

    fn cascade(&self, shift_id: &str) -> ApiResult<ShiftCascade> {
        let shifts = self.repos.shift_repo.list_all()?;
        let jobs = self.repos.production_overlay()?;
        let builder = self.repos.calendar_builder()?;

        let result = cascade_shift_change(&builder, &jobs, &shifts, shift_id);
        if !result.is_clean() {
            tracing::warn!(
                shift_id = %shift_id,
                failed = result.failures.len(),
                "班次变更后部分作业无法排产"
            );
        }

        self.events.publish(ScheduleEvent::for_jobs(
            ScheduleEventType::ShiftChanged,
            Some(EVENT_SOURCE.to_string()),
            result.affected_job_ids.clone(),
        ));
        Ok(result)
    }
}
