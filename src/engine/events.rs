// ==========================================
// 齐套作业排产系统 - 引擎层事件发布
// ==========================================
// 职责: 定义排产事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，API 层在每次变更后发布；
//       多个窗口通过订阅同一事件通道刷新视图
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

// ==========================================
// 排产事件类型
// ==========================================

/// 排产事件触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEventType {
    /// 作业新增/修改/删除/移动
    JobChanged,
    /// 班次新增/修改/启停
    ShiftChanged,
    /// 延误新增/删除
    DelayChanged,
    /// 情景创建或变更集改变
    ScenarioChanged,
    /// 激活情景切换
    ScenarioActivated,
    /// 情景提交到生产
    ScenarioCommitted,
    /// 情景丢弃
    ScenarioDiscarded,
    /// 配置变更
    ConfigChanged,
}

impl ScheduleEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            ScheduleEventType::JobChanged => "JobChanged",
            ScheduleEventType::ShiftChanged => "ShiftChanged",
            ScheduleEventType::DelayChanged => "DelayChanged",
            ScheduleEventType::ScenarioChanged => "ScenarioChanged",
            ScheduleEventType::ScenarioActivated => "ScenarioActivated",
            ScheduleEventType::ScenarioCommitted => "ScenarioCommitted",
            ScheduleEventType::ScenarioDiscarded => "ScenarioDiscarded",
            ScheduleEventType::ConfigChanged => "ConfigChanged",
        }
    }
}

/// 排产事件
///
/// 包含触发类型、关联情景和影响范围
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    /// 事件类型
    pub event_type: ScheduleEventType,
    /// 事件来源描述
    pub source: Option<String>,
    /// 关联情景（None 表示生产数据）
    pub scenario_id: Option<String>,
    /// 受影响的作业列表（None 表示全部）
    pub affected_job_ids: Option<Vec<String>>,
    /// 受影响的日期范围
    pub affected_date_range: Option<(NaiveDate, NaiveDate)>,
    /// 是否需要全量刷新
    pub is_full_scope: bool,
}

impl ScheduleEvent {
    /// 创建全量事件
    pub fn full_scope(event_type: ScheduleEventType, source: Option<String>) -> Self {
        Self {
            event_type,
            source,
            scenario_id: None,
            affected_job_ids: None,
            affected_date_range: None,
            is_full_scope: true,
        }
    }

    /// 创建增量事件
    pub fn for_jobs(
        event_type: ScheduleEventType,
        source: Option<String>,
        job_ids: Vec<String>,
    ) -> Self {
        Self {
            event_type,
            source,
            scenario_id: None,
            affected_job_ids: Some(job_ids),
            affected_date_range: None,
            is_full_scope: false,
        }
    }

    pub fn with_scenario(mut self, scenario_id: impl Into<String>) -> Self {
        self.scenario_id = Some(scenario_id.into());
        self
    }

    pub fn with_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.affected_date_range = Some((from, to));
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 排产事件发布者 Trait
///
/// # 返回
/// - `Ok(event_id)`: 事件序号（如果支持）或空字符串
/// - `Err`: 发布失败
pub trait ScheduleEventPublisher: Send + Sync {
    fn publish(&self, event: ScheduleEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ScheduleEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: ScheduleEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - event_type={}",
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn ScheduleEventPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn ScheduleEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn ScheduleEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    ///
    /// 发布失败只记录告警，不影响已完成的数据变更
    pub fn publish(&self, event: ScheduleEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                "OptionalEventPublisher: 未配置发布者，跳过事件 - event_type={}",
                event.event_type.as_str()
            );
            return;
        };
        let event_type = event.event_type;
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(event_type = event_type.as_str(), error = %e, "事件发布失败");
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

// ==========================================
// InMemoryEventBus - 进程内事件通道
// ==========================================
// 每个订阅者一个 mpsc 通道；订阅者断开后在下次发布时移除
#[derive(Default)]
pub struct InMemoryEventBus {
    subscribers: Mutex<Vec<Sender<ScheduleEvent>>>,
    sequence: AtomicU64,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件
    pub fn subscribe(&self) -> Result<Receiver<ScheduleEvent>, Box<dyn Error + Send + Sync>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .map_err(|e| format!("订阅者列表锁获取失败: {}", e))?
            .push(tx);
        Ok(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl ScheduleEventPublisher for InMemoryEventBus {
    fn publish(&self, event: ScheduleEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|e| format!("订阅者列表锁获取失败: {}", e))?;
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());

        tracing::debug!(
            event_id = id,
            event_type = event.event_type.as_str(),
            subscribers = subscribers.len(),
            "事件已发布"
        );
        Ok(id.to_string())
    }
}
