// ==========================================
// 齐套作业排产系统 - 情景推演 API
// ==========================================
// 职责: 情景创建/激活、变更录入、叠加视图、对比、提交与丢弃
// 状态机: Empty -> Modified -> {Committed, Discarded}
// 红线: 提交为单事务回放，任一变更失败则整体回滚
// 红线: 同一 (scenario, job) 的 MODIFY 合并为一条 (仓储层保证)
// ==========================================

use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};
use crate::api::repositories::ScheduleRepositories;
use crate::domain::scenario::{JobPatch, NewScenarioChange, OverlayJob, Scenario, ScenarioChange};
use crate::domain::types::{ChangeOperation, ScenarioState};
use crate::engine::calendar_builder::ScheduleDelta;
use crate::engine::events::{OptionalEventPublisher, ScheduleEvent, ScheduleEventType};
use crate::engine::job_patch::job_to_patch;
use crate::engine::scenario_diff::CommitSummary;

const EVENT_SOURCE: &str = "ScenarioApi";

// ==========================================
// ScenarioApi - 情景推演 API
// ==========================================
pub struct ScenarioApi {
    repos: ScheduleRepositories,
    events: OptionalEventPublisher,
}

impl ScenarioApi {
    pub fn new(repos: ScheduleRepositories, events: OptionalEventPublisher) -> Self {
        Self { repos, events }
    }

    // ==========================================
    // 情景生命周期
    // ==========================================

    /// 创建情景
    ///
    /// 指定 `source_job_id` 时预置一条 MODIFY 变更，
    /// changeData 与 originalData 均为源作业快照
    pub fn create_scenario(
        &self,
        name: &str,
        description: Option<String>,
        source_job_id: Option<&str>,
    ) -> ApiResult<Scenario> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("情景名称不能为空".to_string()));
        }

        let seed = match source_job_id {
            Some(job_id) => {
                let job = self.repos.job_repo.find_by_id(job_id)?.ok_or_else(|| {
                    ApiError::NotFound(format!("源作业(id={})不存在", job_id))
                })?;
                let snapshot = job_to_patch(&job)?;
                Some(NewScenarioChange::modify(
                    job.id,
                    snapshot.clone(),
                    Some(snapshot),
                ))
            }
            None => None,
        };

        let now = chrono::Local::now().naive_local();
        let scenario = Scenario {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        self.repos.scenario_repo.create(&scenario)?;
        if let Some(change) = &seed {
            self.repos.scenario_repo.add_change(&scenario.id, change)?;
        }

        tracing::info!(
            scenario_id = %scenario.id,
            name = %scenario.name,
            seeded = seed.is_some(),
            "情景已创建"
        );
        self.publish(ScheduleEventType::ScenarioChanged, &scenario.id, Vec::new());
        Ok(scenario)
    }

    pub fn list_scenarios(&self) -> ApiResult<Vec<Scenario>> {
        Ok(self.repos.scenario_repo.list_all()?)
    }

    pub fn get_scenario(&self, scenario_id: &str) -> ApiResult<Scenario> {
        self.repos.require_scenario(scenario_id)
    }

    pub fn get_active(&self) -> ApiResult<Option<Scenario>> {
        Ok(self.repos.scenario_repo.find_active()?)
    }

    /// 激活情景 (原子地停用其他情景)
    pub fn activate(&self, scenario_id: &str) -> ApiResult<Scenario> {
        self.repos.scenario_repo.activate(scenario_id)?;
        let scenario = self.repos.require_scenario(scenario_id)?;

        tracing::info!(scenario_id = %scenario_id, "情景已激活");
        self.publish(ScheduleEventType::ScenarioActivated, scenario_id, Vec::new());
        Ok(scenario)
    }

    /// 回到生产视图
    pub fn deactivate_all(&self) -> ApiResult<()> {
        self.repos.scenario_repo.deactivate_all()?;
        tracing::info!("全部情景已停用");
        self.events.publish(ScheduleEvent::full_scope(
            ScheduleEventType::ScenarioActivated,
            Some(EVENT_SOURCE.to_string()),
        ));
        Ok(())
    }

    pub fn state(&self, scenario_id: &str) -> ApiResult<ScenarioState> {
        self.repos.require_scenario(scenario_id)?;
        let count = self.repos.scenario_repo.count_changes(scenario_id)?;
        Ok(ScenarioState::from_change_count(count))
    }

    // ==========================================
    // 变更录入
    // ==========================================

    /// 录入一条变更
    ///
    /// MODIFY/DELETE 必须引用当前叠加视图中存在的作业；
    /// 未提供 originalData 时由生产作业快照补齐
    pub fn add_change(
        &self,
        scenario_id: &str,
        mut change: NewScenarioChange,
    ) -> ApiResult<ScenarioChange> {
        let (_, overlay) = self.repos.scenario_overlay(scenario_id)?;

        match change.operation {
            ChangeOperation::Add => {
                if change.job_id.is_some() {
                    return Err(ApiError::InvalidInput(
                        "新增变更不应携带作业ID，请放入 changeData.id".to_string(),
                    ));
                }
                // 叠加视图与提交必须使用同一 id
                ensure_payload_id(&mut change.change_data);
                if let Some(Value::String(id)) = change.change_data.get("id") {
                    if overlay.iter().any(|o| &o.job.id == id) {
                        return Err(ApiError::BusinessRuleViolation(format!(
                            "作业ID已存在: {}",
                            id
                        )));
                    }
                }
            }
            ChangeOperation::Modify | ChangeOperation::Delete => {
                let job_id = change.job_id.as_deref().ok_or_else(|| {
                    ApiError::InvalidInput(format!("{}变更必须指定作业ID", change.operation))
                })?;
                let target = overlay.iter().find(|o| o.job.id == job_id).ok_or_else(|| {
                    ApiError::NotFound(format!("作业{}不在情景叠加视图中", job_id))
                })?;
                if target.is_deleted() {
                    return Err(ApiError::BusinessRuleViolation(format!(
                        "作业{}已在情景中被删除",
                        job_id
                    )));
                }
                if change.original_data.is_none() {
                    change.original_data = self.original_snapshot(job_id, &change)?;
                }
            }
        }

        let stored = self.repos.scenario_repo.add_change(scenario_id, &change)?;

        tracing::info!(
            scenario_id = %scenario_id,
            change_id = stored.id,
            operation = %stored.operation,
            job_id = ?stored.job_id,
            "情景变更已录入"
        );
        self.publish(
            ScheduleEventType::ScenarioChanged,
            scenario_id,
            stored.job_id.iter().cloned().collect(),
        );
        Ok(stored)
    }

    /// 在情景中新增作业；payload 未带 id 时由 add_change 分配
    pub fn add_job(&self, scenario_id: &str, payload: JobPatch) -> ApiResult<ScenarioChange> {
        self.add_change(scenario_id, NewScenarioChange::add(payload))
    }

    pub fn modify_job(
        &self,
        scenario_id: &str,
        job_id: &str,
        patch: JobPatch,
    ) -> ApiResult<ScenarioChange> {
        if patch.is_empty() {
            return Err(ApiError::InvalidInput("修改补丁不能为空".to_string()));
        }
        self.add_change(scenario_id, NewScenarioChange::modify(job_id, patch, None))
    }

    pub fn delete_job(&self, scenario_id: &str, job_id: &str) -> ApiResult<ScenarioChange> {
        self.add_change(scenario_id, NewScenarioChange::delete(job_id, None))
    }

    pub fn list_changes(&self, scenario_id: &str) -> ApiResult<Vec<ScenarioChange>> {
        self.repos.require_scenario(scenario_id)?;
        Ok(self.repos.scenario_repo.list_changes(scenario_id)?)
    }

    pub fn remove_change(&self, scenario_id: &str, change_id: i64) -> ApiResult<()> {
        self.repos.require_scenario(scenario_id)?;
        if !self.repos.scenario_repo.remove_change(scenario_id, change_id)? {
            return Err(ApiError::NotFound(format!(
                "ScenarioChange(id={})不存在于情景{}",
                change_id, scenario_id
            )));
        }
        tracing::info!(scenario_id = %scenario_id, change_id, "情景变更已撤销");
        self.publish(ScheduleEventType::ScenarioChanged, scenario_id, Vec::new());
        Ok(())
    }

    // ==========================================
    // 视图与对比
    // ==========================================

    /// 情景叠加作业集 (按需重算，不持久化)
    pub fn overlay(&self, scenario_id: &str) -> ApiResult<Vec<OverlayJob>> {
        Ok(self.repos.scenario_overlay(scenario_id)?.1)
    }

    /// 生产视图与情景视图的完工时刻对比
    pub fn compare(&self, scenario_id: &str) -> ApiResult<Vec<ScheduleDelta>> {
        let (_, scenario) = self.repos.scenario_overlay(scenario_id)?;
        let production = self.repos.production_overlay()?;
        let shifts = self.repos.shift_repo.list_all()?;

        let deltas = self
            .repos
            .calendar_builder()?
            .compare(&production, &scenario, &shifts)?;

        tracing::debug!(scenario_id = %scenario_id, touched = deltas.len(), "情景对比完成");
        Ok(deltas)
    }

    // ==========================================
    // 终态转换
    // ==========================================

    /// 提交情景: 单事务回放全部变更，随后删除情景
    pub fn commit(&self, scenario_id: &str) -> ApiResult<CommitSummary> {
        self.repos.require_scenario(scenario_id)?;
        let summary = self.repos.scenario_repo.commit(scenario_id)?;

        let mut affected = summary.added_job_ids.clone();
        affected.extend(summary.modified_job_ids.iter().cloned());
        affected.extend(summary.deleted_job_ids.iter().cloned());

        tracing::info!(
            scenario_id = %scenario_id,
            total = summary.total(),
            "情景已提交"
        );
        self.publish(ScheduleEventType::ScenarioCommitted, scenario_id, affected);
        Ok(summary)
    }

    /// 丢弃情景: 删除情景及其变更与情景延误，生产数据不受影响
    pub fn discard(&self, scenario_id: &str) -> ApiResult<()> {
        self.repos.scenario_repo.discard(scenario_id)?;
        tracing::info!(scenario_id = %scenario_id, "情景已丢弃");
        self.publish(ScheduleEventType::ScenarioDiscarded, scenario_id, Vec::new());
        Ok(())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 生产作业快照；MODIFY 只保留被修改的字段
    fn original_snapshot(
        &self,
        job_id: &str,
        change: &NewScenarioChange,
    ) -> ApiResult<Option<JobPatch>> {
        let Some(job) = self.repos.job_repo.find_by_id(job_id)? else {
            return Ok(None);
        };
        let full = job_to_patch(&job)?;
        if change.operation == ChangeOperation::Delete {
            return Ok(Some(full));
        }
        Ok(Some(
            full.into_iter()
                .filter(|(key, _)| change.change_data.contains_key(key))
                .collect(),
        ))
    }

    fn publish(&self, event_type: ScheduleEventType, scenario_id: &str, job_ids: Vec<String>) {
        let source = Some(EVENT_SOURCE.to_string());
        let event = if job_ids.is_empty() {
            ScheduleEvent::full_scope(event_type, source)
        } else {
            ScheduleEvent::for_jobs(event_type, source, job_ids)
        };
        self.events.publish(event.with_scenario(scenario_id));
    }
}

fn ensure_payload_id(payload: &mut JobPatch) {
    let has_id = matches!(payload.get("id"), Some(Value::String(s)) if !s.trim().is_empty());
    if !has_id {
        payload.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }
}
