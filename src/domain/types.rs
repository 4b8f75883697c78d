// ==========================================
// 齐套作业排产系统 - 领域类型定义
// ==========================================
// 职责: 情景变更操作、情景状态、叠加标记等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 情景变更操作 (Change Operation)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeOperation {
    Add,    // 新增作业
    Modify, // 修改作业
    Delete, // 删除作业
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ChangeOperation {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChangeOperation::Add => "ADD",
            ChangeOperation::Modify => "MODIFY",
            ChangeOperation::Delete => "DELETE",
        }
    }

    /// 从数据库字符串解析（未知值返回 None，由调用方决定如何报错）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ADD" => Some(ChangeOperation::Add),
            "MODIFY" => Some(ChangeOperation::Modify),
            "DELETE" => Some(ChangeOperation::Delete),
            _ => None,
        }
    }
}

// ==========================================
// 情景状态 (Scenario State)
// ==========================================
// 状态机: Empty -> Modified -> {Committed, Discarded}
// Committed/Discarded 为终态，记录随即删除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioState {
    Empty,
    Modified,
    Committed,
    Discarded,
}

impl ScenarioState {
    /// 由变更条数推导存活情景的状态
    pub fn from_change_count(count: usize) -> Self {
        if count == 0 {
            ScenarioState::Empty
        } else {
            ScenarioState::Modified
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScenarioState::Committed | ScenarioState::Discarded)
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioState::Empty => write!(f, "EMPTY"),
            ScenarioState::Modified => write!(f, "MODIFIED"),
            ScenarioState::Committed => write!(f, "COMMITTED"),
            ScenarioState::Discarded => write!(f, "DISCARDED"),
        }
    }
}

// ==========================================
// 叠加作业标记 (Overlay Status)
// ==========================================
// 用途: 驱动前端的新增/修改/幽灵(已删除)渲染
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverlayStatus {
    Added,
    Modified,
    Deleted,
    /// 作业本身未改，仅挂有该情景的延误
    Delayed,
}

impl fmt::Display for OverlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayStatus::Added => write!(f, "ADDED"),
            OverlayStatus::Modified => write!(f, "MODIFIED"),
            OverlayStatus::Deleted => write!(f, "DELETED"),
            OverlayStatus::Delayed => write!(f, "DELAYED"),
        }
    }
}
