// ==========================================
// 齐套作业排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope，目前只用 global)
// 约定: 配置缺失或格式错误时记录告警并使用默认值
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::shift::{format_hhmm, parse_hhmm};
use crate::engine::scheduler::SchedulerConfig;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置（UPSERT）
    pub fn set_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 全部 global 配置快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    // ===== 排产引擎配置 =====

    /// 读取排产引擎配置
    pub fn scheduler_config(&self) -> RepositoryResult<SchedulerConfig> {
        let defaults = SchedulerConfig::default();

        let fallback_raw = self.get_config_or_default(
            config_keys::ALLOW_CONTINUOUS_FALLBACK,
            if defaults.allow_continuous_fallback { "true" } else { "false" },
        )?;
        let allow_continuous_fallback = match fallback_raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                tracing::warn!(
                    config_key = config_keys::ALLOW_CONTINUOUS_FALLBACK,
                    raw_value = %fallback_raw,
                    "配置格式错误，使用默认值"
                );
                defaults.allow_continuous_fallback
            }
        };

        let lookahead_raw = self.get_config_or_default(
            config_keys::LOOKAHEAD_DAYS,
            &defaults.lookahead_days.to_string(),
        )?;
        let lookahead_days = lookahead_raw.trim().parse::<u32>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::LOOKAHEAD_DAYS,
                raw_value = %lookahead_raw,
                "配置格式错误，使用默认值"
            );
            defaults.lookahead_days
        });

        let cap_raw = self.get_config_or_default(
            config_keys::DAY_END_CAP,
            &format_hhmm(defaults.day_end_cap),
        )?;
        let day_end_cap = parse_hhmm(&cap_raw).unwrap_or_else(|e| {
            tracing::warn!(
                config_key = config_keys::DAY_END_CAP,
                error = %e,
                "配置格式错误，使用默认值"
            );
            defaults.day_end_cap
        });

        Ok(SchedulerConfig {
            allow_continuous_fallback,
            lookahead_days,
            day_end_cap,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 排产引擎
    pub const ALLOW_CONTINUOUS_FALLBACK: &str = "scheduler.allow_continuous_fallback";
    pub const LOOKAHEAD_DAYS: &str = "scheduler.lookahead_days";

    // 日历展示
    pub const DAY_END_CAP: &str = "calendar.day_end_cap";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_missing() {
        let config = manager().scheduler_config().unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_overrides_and_malformed_values() {
        let manager = manager();
        manager.set_value(config_keys::ALLOW_CONTINUOUS_FALLBACK, "false").unwrap();
        manager.set_value(config_keys::LOOKAHEAD_DAYS, "30").unwrap();
        manager.set_value(config_keys::DAY_END_CAP, "25:99").unwrap();

        let config = manager.scheduler_config().unwrap();
        assert!(!config.allow_continuous_fallback);
        assert_eq!(config.lookahead_days, 30);
        assert_eq!(config.day_end_cap, SchedulerConfig::default().day_end_cap);

        manager.set_value(config_keys::LOOKAHEAD_DAYS, "7").unwrap();
        assert_eq!(manager.scheduler_config().unwrap().lookahead_days, 7);
        assert_eq!(manager.get_config_snapshot().unwrap().len(), 3);
    }
}
