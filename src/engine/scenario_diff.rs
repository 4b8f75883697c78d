// ==========================================
// 齐套作业排产系统 - 情景差异引擎
// ==========================================
// 职责:
// - 叠加计算: 生产作业集 + 按序回放情景变更 -> 叠加作业集 (不落库)
// - 提交回放: 通过 JobStore 把变更逐条写入真实作业存储
// 红线: 叠加计算宽松 (无效补丁记录告警后跳过)；提交回放严格 (任一失败即报错，
//       由存储方回滚整个事务)
// 红线: DELETE 在叠加中只打标记，从不物理移除
// ==========================================

use crate::domain::delay::JobDelay;
use crate::domain::job::Job;
use crate::domain::scenario::{
    NewScenarioChange, OverlayAnnotation, OverlayJob, Scenario, ScenarioChange,
};
use crate::domain::types::{ChangeOperation, OverlayStatus};
use crate::engine::delay_injection::{apply_delays, ExpandedJob};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::job_patch::{apply_patch, job_from_payload, merge_patch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// JobStore - 真实作业存储 (由仓储层在事务内实现)
// ==========================================
pub trait JobStore {
    fn find_job(&self, job_id: &str) -> EngineResult<Option<Job>>;

    fn insert_job(&mut self, job: &Job) -> EngineResult<()>;

    fn update_job(&mut self, job: &Job) -> EngineResult<()>;

    /// 返回是否删除了记录
    fn delete_job(&mut self, job_id: &str) -> EngineResult<bool>;
}

/// 提交回放结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub added_job_ids: Vec<String>,
    pub modified_job_ids: Vec<String>,
    pub deleted_job_ids: Vec<String>,
}

impl CommitSummary {
    pub fn total(&self) -> usize {
        self.added_job_ids.len() + self.modified_job_ids.len() + self.deleted_job_ids.len()
    }
}

/// 叠加中新增作业的临时ID
pub fn pending_job_id(change_id: i64) -> String {
    format!("pending-{}", change_id)
}

// ==========================================
// 变更合并
// ==========================================

/// 同一 (情景, 作业) 的重复 MODIFY 合并到已有变更 (浅合并，后写覆盖)
pub fn merge_modify_change(existing: &mut ScenarioChange, incoming: &NewScenarioChange) {
    merge_patch(&mut existing.change_data, &incoming.change_data);
    match (&mut existing.original_data, &incoming.original_data) {
        (Some(base), Some(newer)) => merge_patch(base, newer),
        (None, Some(newer)) => existing.original_data = Some(newer.clone()),
        _ => {}
    }
}

// ==========================================
// 叠加计算
// ==========================================

/// 生产视图: 仅应用生产延误，无情景标记
pub fn expand_production(jobs: &[Job], delays: &[JobDelay]) -> Vec<OverlayJob> {
    let production_delays: Vec<JobDelay> =
        delays.iter().filter(|d| d.is_production()).cloned().collect();
    jobs.iter()
        .map(|job| into_overlay(apply_delays(job, &production_delays), None))
        .collect()
}

/// 计算情景叠加作业集
///
/// 从生产作业集出发按变更ID顺序回放，然后对每个作业注入
/// 生产延误与该情景的延误。结果仅依赖输入，重复计算结果一致。
pub fn compute_overlay(
    production: &[Job],
    scenario: &Scenario,
    changes: &[ScenarioChange],
    delays: &[JobDelay],
) -> Vec<OverlayJob> {
    let mut entries: Vec<(Job, Option<OverlayAnnotation>)> =
        production.iter().cloned().map(|job| (job, None)).collect();

    let mut ordered: Vec<&ScenarioChange> = changes.iter().collect();
    ordered.sort_by_key(|c| c.id);

    for change in ordered {
        let annotation = |status: OverlayStatus| OverlayAnnotation {
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            status,
            change_id: Some(change.id),
        };

        match change.operation {
            ChangeOperation::Add => {
                match job_from_payload(&change.change_data, &pending_job_id(change.id)) {
                    Ok(job) => entries.push((job, Some(annotation(OverlayStatus::Added)))),
                    Err(e) => tracing::warn!(
                        scenario_id = %scenario.id,
                        change_id = change.id,
                        error = %e,
                        "叠加计算跳过无效的新增变更"
                    ),
                }
            }
            ChangeOperation::Modify => {
                let Some(entry) = find_entry(&mut entries, change) else {
                    continue;
                };
                match apply_patch(&entry.0, &change.change_data) {
                    Ok(patched) => {
                        let status = match &entry.1 {
                            Some(a) if a.status == OverlayStatus::Added => OverlayStatus::Added,
                            _ => OverlayStatus::Modified,
                        };
                        *entry = (patched, Some(annotation(status)));
                    }
                    Err(e) => tracing::warn!(
                        scenario_id = %scenario.id,
                        change_id = change.id,
                        error = %e,
                        "叠加计算跳过无效的修改补丁"
                    ),
                }
            }
            ChangeOperation::Delete => {
                if let Some(entry) = find_entry(&mut entries, change) {
                    entry.1 = Some(annotation(OverlayStatus::Deleted));
                }
            }
        }
    }

    let visible: Vec<JobDelay> = delays
        .iter()
        .filter(|d| d.visible_in(&scenario.id))
        .cloned()
        .collect();

    // 仅被情景延误触及的作业也要标记
    for (job, annotation) in entries.iter_mut().filter(|(_, a)| a.is_none()) {
        let delayed = visible
            .iter()
            .any(|d| !d.is_production() && d.job_id == job.id);
        if delayed {
            *annotation = Some(OverlayAnnotation {
                scenario_id: scenario.id.clone(),
                scenario_name: scenario.name.clone(),
                status: OverlayStatus::Delayed,
                change_id: None,
            });
        }
    }

    entries
        .into_iter()
        .map(|(job, annotation)| into_overlay(apply_delays(&job, &visible), annotation))
        .collect()
}

fn find_entry<'a>(
    entries: &'a mut [(Job, Option<OverlayAnnotation>)],
    change: &ScenarioChange,
) -> Option<&'a mut (Job, Option<OverlayAnnotation>)> {
    let job_id = change.job_id.as_deref()?;
    let found = entries.iter_mut().find(|(job, _)| job.id == job_id);
    if found.is_none() {
        tracing::warn!(
            change_id = change.id,
            job_id = %job_id,
            "叠加计算中变更引用的作业不存在"
        );
    }
    found
}

fn into_overlay(expanded: ExpandedJob, annotation: Option<OverlayAnnotation>) -> OverlayJob {
    OverlayJob {
        job: expanded.job,
        steps: expanded.steps,
        delay_seconds: expanded.delay_seconds,
        annotation,
    }
}

// ==========================================
// 提交回放
// ==========================================

/// 按变更ID顺序把变更写入作业存储
///
/// 任一变更失败立即返回错误；调用方负责回滚已写入的部分
pub fn replay_changes(
    store: &mut dyn JobStore,
    changes: &[ScenarioChange],
) -> EngineResult<CommitSummary> {
    let mut ordered: Vec<&ScenarioChange> = changes.iter().collect();
    ordered.sort_by_key(|c| c.id);

    // 叠加中的 pending-N -> 提交时的真实ID
    let mut assigned: HashMap<String, String> = HashMap::new();
    let mut summary = CommitSummary::default();
    for change in ordered {
        match change.operation {
            ChangeOperation::Add => {
                let fallback_id = uuid::Uuid::new_v4().to_string();
                let job = job_from_payload(&change.change_data, &fallback_id)?;
                if store.find_job(&job.id)?.is_some() {
                    return Err(EngineError::InvalidPatch(format!(
                        "新增作业ID已存在: {}",
                        job.id
                    )));
                }
                store.insert_job(&job)?;
                assigned.insert(pending_job_id(change.id), job.id.clone());
                summary.added_job_ids.push(job.id);
            }
            ChangeOperation::Modify => {
                let job_id = resolve_job_id(change, &assigned)?;
                let current = store
                    .find_job(job_id)?
                    .ok_or_else(|| EngineError::UnknownJob(job_id.to_string()))?;
                let patched = apply_patch(&current, &change.change_data)?;
                store.update_job(&patched)?;
                summary.modified_job_ids.push(patched.id);
            }
            ChangeOperation::Delete => {
                let job_id = resolve_job_id(change, &assigned)?;
                if !store.delete_job(job_id)? {
                    return Err(EngineError::UnknownJob(job_id.to_string()));
                }
                summary.deleted_job_ids.push(job_id.to_string());
            }
        }
    }
    Ok(summary)
}

fn resolve_job_id<'a>(
    change: &'a ScenarioChange,
    assigned: &'a HashMap<String, String>,
) -> EngineResult<&'a str> {
    let job_id = change
        .job_id
        .as_deref()
        .ok_or(EngineError::MissingJobId(change.id))?;
    Ok(assigned.get(job_id).map(String::as_str).unwrap_or(job_id))
}
