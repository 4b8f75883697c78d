// ==========================================
// 齐套作业排产系统 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新 (排产引擎参数)
// 规则: 已知键写入前按类型校验，写入后发布 ConfigChanged 事件
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::{config_keys, ConfigManager};
use crate::domain::shift::parse_hhmm;
use crate::engine::events::{OptionalEventPublisher, ScheduleEvent, ScheduleEventType};
use crate::engine::scheduler::SchedulerConfig;

/// 配置项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    events: OptionalEventPublisher,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>, events: OptionalEventPublisher) -> Self {
        Self {
            config_manager,
            events,
        }
    }

    /// 查询所有配置 (按键排序)
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        Ok(self
            .config_manager
            .get_config_snapshot()?
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect())
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.config_manager.get_global_config_value(key)?)
    }

    /// 更新单个配置
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        if key.trim().is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }
        validate_value(key, value)?;

        self.config_manager.set_value(key, value)?;
        tracing::info!(key = %key, value = %value, "配置已更新");

        self.events.publish(ScheduleEvent::full_scope(
            ScheduleEventType::ConfigChanged,
            Some("ConfigApi".to_string()),
        ));
        Ok(())
    }

    /// 当前生效的排产引擎参数
    pub fn scheduler_config(&self) -> ApiResult<SchedulerConfig> {
        Ok(self.config_manager.scheduler_config()?)
    }
}

fn validate_value(key: &str, value: &str) -> ApiResult<()> {
    let invalid = |reason: &str| {
        ApiError::InvalidInput(format!("配置{}的值无效({}): {}", key, reason, value))
    };
    match key {
        config_keys::ALLOW_CONTINUOUS_FALLBACK => {
            match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "false" | "0" | "no" => Ok(()),
                _ => Err(invalid("应为 true/false")),
            }
        }
        config_keys::LOOKAHEAD_DAYS => match value.trim().parse::<u32>() {
            Ok(days) if days > 0 => Ok(()),
            _ => Err(invalid("应为正整数")),
        },
        config_keys::DAY_END_CAP => parse_hhmm(value)
            .map(|_| ())
            .map_err(|_| invalid("应为 HH:MM")),
        _ => Ok(()),
    }
}
