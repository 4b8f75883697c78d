// ==========================================
// 齐套作业排产系统 - 引擎层错误类型
// ==========================================
// 分类:
// - 配置/输入错误: 同步返回调用方，不做静默修正 (24/7 回退除外)
// - 引用错误: 回放变更时引用不存在的作业，整个事务回滚
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::shift::InvalidTimeError;
use chrono::NaiveDateTime;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 配置/输入错误 =====
    #[error(transparent)]
    InvalidTime(#[from] InvalidTimeError),

    #[error("时长不能为负数 (field={field}): {value}")]
    NegativeDuration { field: String, value: i64 },

    #[error("时长超出可排产范围 (field={field}): {value}")]
    DurationOverflow { field: String, value: i64 },

    #[error("工位数必须 >= 1: {0}")]
    InvalidStationCount(u32),

    #[error("班次配置无效 (shift_id={shift_id}): {reason}")]
    InvalidShift { shift_id: String, reason: String },

    #[error("有效班次集合为空且未启用 24/7 回退")]
    EmptyShiftSet,

    #[error("从 {from} 起 {lookahead_days} 天内没有可用的工作时间窗")]
    NoProductiveWindow {
        from: NaiveDateTime,
        lookahead_days: u32,
    },

    #[error("作业补丁无效: {0}")]
    InvalidPatch(String),

    // ===== 引用错误 =====
    #[error("作业不存在: job_id={0}")]
    UnknownJob(String),

    #[error("变更缺少作业ID: change_id={0}")]
    MissingJobId(i64),

    // ===== 协作方错误 =====
    #[error("存储操作失败: {0}")]
    Storage(String),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
