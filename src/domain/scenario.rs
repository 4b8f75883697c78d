// ==========================================
// 齐套作业排产系统 - 情景推演领域模型
// ==========================================
// 情景: 对生产作业集的命名假设性叠加 (可提交或丢弃)
// 红线: 全系统同时最多一个激活情景 (由仓储层原子切换保证)
// 红线: 同一 (scenario, job) 最多一条 MODIFY 变更
// ==========================================

use crate::domain::job::{Job, ScheduleStep};
use crate::domain::types::{ChangeOperation, OverlayStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 作业局部补丁 (字段名 -> 新值)，提交时才按作业结构校验
pub type JobPatch = Map<String, Value>;

// ==========================================
// Scenario - 情景
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ScenarioChange - 情景变更
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioChange {
    pub id: i64,                      // 自增ID，决定回放顺序
    pub scenario_id: String,
    pub job_id: Option<String>,       // 仅 ADD 可为空
    pub operation: ChangeOperation,
    pub change_data: JobPatch,
    pub original_data: Option<JobPatch>, // 变更前快照，仅供展示，从不回放
    pub created_at: NaiveDateTime,
}

/// 待写入的变更（尚未分配ID）
#[derive(Debug, Clone, PartialEq)]
pub struct NewScenarioChange {
    pub job_id: Option<String>,
    pub operation: ChangeOperation,
    pub change_data: JobPatch,
    pub original_data: Option<JobPatch>,
}

impl NewScenarioChange {
    pub fn add(payload: JobPatch) -> Self {
        Self {
            job_id: None,
            operation: ChangeOperation::Add,
            change_data: payload,
            original_data: None,
        }
    }

    pub fn modify(job_id: impl Into<String>, patch: JobPatch, original: Option<JobPatch>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            operation: ChangeOperation::Modify,
            change_data: patch,
            original_data: original,
        }
    }

    pub fn delete(job_id: impl Into<String>, original: Option<JobPatch>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            operation: ChangeOperation::Delete,
            change_data: JobPatch::new(),
            original_data: original,
        }
    }
}

// ==========================================
// OverlayJob - 叠加作业 (从不持久化)
// ==========================================
/// 叠加标记: 标明作业来自哪个情景以及如何被改动
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayAnnotation {
    pub scenario_id: String,
    pub scenario_name: String,
    pub status: OverlayStatus,
    pub change_id: Option<i64>, // 仅情景延误触及时为 None
}

impl OverlayAnnotation {
    /// 逻辑删除（幽灵渲染）
    pub fn is_deleted(&self) -> bool {
        self.status == OverlayStatus::Deleted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayJob {
    pub job: Job,                            // expected_job_duration 已含延误
    pub steps: Vec<ScheduleStep>,            // 含插入的延误步骤
    pub delay_seconds: i64,
    pub annotation: Option<OverlayAnnotation>, // None = 未被情景触及的生产作业
}

impl OverlayJob {
    pub fn is_deleted(&self) -> bool {
        self.annotation.as_ref().map(|a| a.is_deleted()).unwrap_or(false)
    }

    pub fn is_touched(&self) -> bool {
        self.annotation.is_some()
    }
}
