// ==========================================
// 齐套作业排产系统 - 延误领域模型
// ==========================================
// scenario_id = None: 生产延误 (作用于真实作业)
// scenario_id = Some: 情景延误 (仅在推演中生效)
// insert_after = 0: 紧接准备之后、第一道工序之前
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// JobDelay - 作业延误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDelay {
    pub id: String,
    pub scenario_id: Option<String>,
    pub job_id: String,
    pub name: String,
    pub duration: i64,      // 秒, > 0
    pub insert_after: u32,  // 工序 order
    pub created_at: NaiveDateTime,
}

impl JobDelay {
    /// 是否为生产延误
    pub fn is_production(&self) -> bool {
        self.scenario_id.is_none()
    }

    /// 是否对指定情景可见（生产延误对所有情景可见）
    pub fn visible_in(&self, scenario_id: &str) -> bool {
        match &self.scenario_id {
            Some(id) => id == scenario_id,
            None => true,
        }
    }
}

// ==========================================
// DelayStep - 插入工序序列中的延误步骤
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayStep {
    pub delay_id: String,   // 来源延误ID
    pub name: String,
    pub duration_seconds: i64,
    pub order: u32,
}

impl From<&JobDelay> for DelayStep {
    fn from(delay: &JobDelay) -> Self {
        Self {
            delay_id: delay.id.clone(),
            name: delay.name.clone(),
            duration_seconds: delay.duration,
            order: delay.insert_after,
        }
    }
}
