// ==========================================
// 齐套作业排产系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键、busy_timeout)
// - 幂等建表: 班次/作业/情景/情景变更/延误/配置/版本
// - job_delay.job_id 的引用完整性由触发器维护 (生产延误校验 + 删除作业级联)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表，并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS shift (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            break_start TEXT,
            break_duration_min INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0,
            color TEXT
        );

        CREATE TABLE IF NOT EXISTS job (
            id TEXT PRIMARY KEY,
            job_number TEXT NOT NULL DEFAULT '',
            customer TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            ordered_quantity INTEGER NOT NULL DEFAULT 1,
            route_steps TEXT NOT NULL DEFAULT '[]',
            setup INTEGER NOT NULL DEFAULT 0,
            make_ready INTEGER NOT NULL DEFAULT 0,
            take_down INTEGER NOT NULL DEFAULT 0,
            station_count INTEGER NOT NULL DEFAULT 1 CHECK (station_count >= 1),
            scheduled_date TEXT,
            scheduled_start_time TEXT,
            allowed_shift_ids TEXT NOT NULL DEFAULT '[]',
            include_weekends INTEGER NOT NULL DEFAULT 0,
            expected_kit_duration INTEGER NOT NULL DEFAULT 0,
            expected_job_duration INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_job_scheduled_date ON job(scheduled_date);

        CREATE TABLE IF NOT EXISTS scenario (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS scenario_change (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scenario_id TEXT NOT NULL REFERENCES scenario(id) ON DELETE CASCADE,
            job_id TEXT,
            operation TEXT NOT NULL CHECK (operation IN ('ADD', 'MODIFY', 'DELETE')),
            change_data TEXT NOT NULL DEFAULT '{}',
            original_data TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scenario_change_scenario
            ON scenario_change(scenario_id, id);

        -- job_id 不设外键: 情景延误可引用仅存在于情景中的新增作业
        CREATE TABLE IF NOT EXISTS job_delay (
            id TEXT PRIMARY KEY,
            scenario_id TEXT REFERENCES scenario(id) ON DELETE CASCADE,
            job_id TEXT NOT NULL,
            name TEXT NOT NULL,
            duration INTEGER NOT NULL CHECK (duration > 0),
            insert_after INTEGER NOT NULL DEFAULT 0 CHECK (insert_after >= 0),
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_job_delay_job ON job_delay(job_id);

        -- 生产延误必须引用已存在的作业
        CREATE TRIGGER IF NOT EXISTS trg_job_delay_production_ref
        BEFORE INSERT ON job_delay
        WHEN NEW.scenario_id IS NULL
            AND NOT EXISTS (SELECT 1 FROM job WHERE id = NEW.job_id)
        BEGIN
            SELECT RAISE(ABORT, 'FOREIGN KEY constraint failed: job_delay.job_id');
        END;

        -- 删除作业时级联删除其延误 (生产与情景)
        CREATE TRIGGER IF NOT EXISTS trg_job_delete_delays
        AFTER DELETE ON job
        BEGIN
            DELETE FROM job_delay WHERE job_id = OLD.id;
        END;
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
