// ==========================================
// 齐套作业排产系统 - 作业管理 API
// ==========================================
// 职责: 作业增删改查、排产锚点调整、日片段拖动、延误管理
// 红线: 任何写入路径都先重算派生时长 (EKD/EJD)，禁止写入陈旧值
// 红线: 拖动任一日片段 = 平移整个作业，全部片段重新派生
// ==========================================

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::repositories::ScheduleRepositories;
use crate::domain::calendar::{parse_segment_id, JobCalendar};
use crate::domain::delay::JobDelay;
use crate::domain::job::Job;
use crate::domain::scenario::JobPatch;
use crate::engine::events::{OptionalEventPublisher, ScheduleEvent, ScheduleEventType};
use crate::engine::job_patch::apply_patch;
use crate::engine::scenario_diff::expand_production;
use crate::engine::station;

const EVENT_SOURCE: &str = "JobApi";

/// 新增延误请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDelayRequest {
    pub job_id: String,
    pub scenario_id: Option<String>, // None = 生产延误
    pub name: String,
    pub duration: i64,
    pub insert_after: u32,
}

// ==========================================
// JobApi - 作业管理 API
// ==========================================
pub struct JobApi {
    repos: ScheduleRepositories,
    events: OptionalEventPublisher,
}

impl JobApi {
    pub fn new(repos: ScheduleRepositories, events: OptionalEventPublisher) -> Self {
        Self { repos, events }
    }

    pub fn list_jobs(&self) -> ApiResult<Vec<Job>> {
        Ok(self.repos.job_repo.list_all()?)
    }

    pub fn get_job(&self, job_id: &str) -> ApiResult<Job> {
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("作业ID不能为空".to_string()));
        }
        self.repos
            .job_repo
            .find_by_id(job_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Job(id={})不存在", job_id)))
    }

    /// 新建作业；id 为空时自动生成
    pub fn create_job(&self, mut job: Job) -> ApiResult<Job> {
        if job.id.trim().is_empty() {
            job.id = uuid::Uuid::new_v4().to_string();
        }
        station::recalculate(&mut job)?;
        self.repos.job_repo.insert(&job)?;

        tracing::info!(
            job_id = %job.id,
            expected_job_duration = job.expected_job_duration,
            "作业已创建"
        );
        self.publish(vec![job.id.clone()]);
        Ok(job)
    }

    /// 整体更新作业
    pub fn update_job(&self, mut job: Job) -> ApiResult<Job> {
        station::recalculate(&mut job)?;
        self.repos.job_repo.update(&job)?;

        tracing::info!(job_id = %job.id, "作业已更新");
        self.publish(vec![job.id.clone()]);
        Ok(job)
    }

    /// 局部更新作业 (字段校验同情景提交)
    pub fn patch_job(&self, job_id: &str, patch: &JobPatch) -> ApiResult<Job> {
        let current = self.get_job(job_id)?;
        let patched = apply_patch(&current, patch)?;
        self.repos.job_repo.update(&patched)?;

        tracing::info!(job_id = %job_id, fields = patch.len(), "作业已局部更新");
        self.publish(vec![job_id.to_string()]);
        Ok(patched)
    }

    /// 调整并行工位数
    pub fn set_station_count(&self, job_id: &str, station_count: u32) -> ApiResult<Job> {
        let mut job = self.get_job(job_id)?;
        job.station_count = station_count;
        self.update_job(job)
    }

    pub fn delete_job(&self, job_id: &str) -> ApiResult<()> {
        if !self.repos.job_repo.delete(job_id)? {
            return Err(ApiError::NotFound(format!("Job(id={})不存在", job_id)));
        }
        tracing::info!(job_id = %job_id, "作业已删除");
        self.publish(vec![job_id.to_string()]);
        Ok(())
    }

    // ==========================================
    // 排产
    // ==========================================

    /// 设置排产锚点并返回派生日历
    pub fn schedule_job(
        &self,
        job_id: &str,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
    ) -> ApiResult<JobCalendar> {
        let mut job = self.get_job(job_id)?;
        job.scheduled_date = Some(date);
        job.scheduled_start_time = start_time;
        let job = self.update_job(job)?;
        self.calendar_for(&job)
    }

    /// 拖动日片段到目标日期: 整个作业按相同天数平移，开始时刻不变
    pub fn move_segment(&self, segment_id: &str, target_date: NaiveDate) -> ApiResult<JobCalendar> {
        let (job_id, day_index) = parse_segment_id(segment_id)
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的片段ID: {}", segment_id)))?;

        let job = self.get_job(&job_id)?;
        let anchor = job.scheduled_date.ok_or_else(|| {
            ApiError::BusinessRuleViolation(format!("作业{}尚未排产，无法拖动片段", job_id))
        })?;

        let current = self.calendar_for(&job)?;
        let segment = current
            .segments
            .iter()
            .find(|s| s.day_index == day_index)
            .ok_or_else(|| ApiError::NotFound(format!("片段{}不存在", segment_id)))?;

        let shift_days = (target_date - segment.date).num_days();
        let new_date = anchor + Duration::days(shift_days);

        tracing::info!(
            job_id = %job_id,
            day_index,
            from = %anchor,
            to = %new_date,
            "日片段拖动，整体平移作业"
        );
        self.schedule_job(&job_id, new_date, job.scheduled_start_time)
    }

    /// 生产视图下单个作业的日历
    pub fn job_calendar(&self, job_id: &str) -> ApiResult<JobCalendar> {
        let job = self.get_job(job_id)?;
        self.calendar_for(&job)
    }

    fn calendar_for(&self, job: &Job) -> ApiResult<JobCalendar> {
        let delays = self.repos.delay_repo.list_for_job(&job.id)?;
        let overlay = expand_production(std::slice::from_ref(job), &delays)
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InternalError(format!("作业{}展开失败", job.id)))?;

        let shifts = self.repos.shift_repo.list_all()?;
        self.repos
            .calendar_builder()?
            .build(&overlay, &shifts)?
            .ok_or_else(|| ApiError::BusinessRuleViolation(format!("作业{}尚未排产", job.id)))
    }

    // ==========================================
    // 延误
    // ==========================================

    /// 添加延误 (生产或情景)
    pub fn add_delay(&self, request: NewDelayRequest) -> ApiResult<JobDelay> {
        if request.duration <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "延误时长必须大于 0: {}",
                request.duration
            )));
        }
        if request.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("延误名称不能为空".to_string()));
        }
        match &request.scenario_id {
            // 情景延误可挂在该情景新增的作业上
            Some(scenario_id) => {
                let (_, overlay) = self.repos.scenario_overlay(scenario_id)?;
                let target = overlay
                    .iter()
                    .find(|o| o.job.id == request.job_id)
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("作业{}不在情景叠加视图中", request.job_id))
                    })?;
                if target.is_deleted() {
                    return Err(ApiError::BusinessRuleViolation(format!(
                        "作业{}已在情景中被删除",
                        request.job_id
                    )));
                }
            }
            None => {
                self.get_job(&request.job_id)?;
            }
        }

        let delay = JobDelay {
            id: uuid::Uuid::new_v4().to_string(),
            scenario_id: request.scenario_id,
            job_id: request.job_id,
            name: request.name,
            duration: request.duration,
            insert_after: request.insert_after,
            created_at: chrono::Local::now().naive_local(),
        };
        self.repos.delay_repo.insert(&delay)?;

        tracing::info!(
            delay_id = %delay.id,
            job_id = %delay.job_id,
            scenario_id = ?delay.scenario_id,
            duration = delay.duration,
            "延误已添加"
        );
        self.publish_delay(&delay);
        Ok(delay)
    }

    pub fn list_delays(&self, job_id: &str) -> ApiResult<Vec<JobDelay>> {
        Ok(self.repos.delay_repo.list_for_job(job_id)?)
    }

    pub fn remove_delay(&self, delay_id: &str) -> ApiResult<()> {
        let delay = self
            .repos
            .delay_repo
            .find_by_id(delay_id)?
            .ok_or_else(|| ApiError::NotFound(format!("JobDelay(id={})不存在", delay_id)))?;
        self.repos.delay_repo.delete(delay_id)?;

        tracing::info!(delay_id = %delay_id, job_id = %delay.job_id, "延误已删除");
        self.publish_delay(&delay);
        Ok(())
    }

    fn publish(&self, job_ids: Vec<String>) {
        self.events.publish(ScheduleEvent::for_jobs(
            ScheduleEventType::JobChanged,
            Some(EVENT_SOURCE.to_string()),
            job_ids,
        ));
    }

    fn publish_delay(&self, delay: &JobDelay) {
        let event = ScheduleEvent::for_jobs(
            ScheduleEventType::DelayChanged,
            Some(EVENT_SOURCE.to_string()),
            vec![delay.job_id.clone()],
        );
        let event = match &delay.scenario_id {
            Some(id) => event.with_scenario(id.clone()),
            None => event,
        };
        self.events.publish(event);
    }
}
