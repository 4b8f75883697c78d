// ==========================================
// 齐套作业排产系统 - 延误仓储
// ==========================================
// 职责: 管理 job_delay 表
// scenario_id 为 NULL = 生产延误；非 NULL = 情景延误 (随情景删除级联删除)
// ==========================================

use crate::domain::delay::JobDelay;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str =
    "SELECT id, scenario_id, job_id, name, duration, insert_after, created_at FROM job_delay";

fn map_delay(row: &Row<'_>) -> rusqlite::Result<JobDelay> {
    Ok(JobDelay {
        id: row.get(0)?,
        scenario_id: row.get(1)?,
        job_id: row.get(2)?,
        name: row.get(3)?,
        duration: row.get(4)?,
        insert_after: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// 情景延误转为生产延误 (情景提交时在同一事务内、变更回放之后调用)
///
/// 回放后仍不存在的作业上的情景延误直接丢弃
pub(crate) fn promote_scenario_delays_in(conn: &Connection, scenario_id: &str) -> RepositoryResult<usize> {
    let orphaned = conn.execute(
        "DELETE FROM job_delay WHERE scenario_id = ?1 AND job_id NOT IN (SELECT id FROM job)",
        params![scenario_id],
    )?;
    if orphaned > 0 {
        tracing::warn!(scenario_id = %scenario_id, orphaned, "丢弃引用不存在作业的情景延误");
    }
    let affected = conn.execute(
        "UPDATE job_delay SET scenario_id = NULL WHERE scenario_id = ?1",
        params![scenario_id],
    )?;
    Ok(affected)
}

// ==========================================
// DelayRepository - 延误仓储
// ==========================================
pub struct DelayRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DelayRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> RepositoryResult<Vec<JobDelay>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} {} ORDER BY job_id, insert_after, created_at, id",
            SELECT_COLUMNS, filter
        ))?;
        let delays = stmt
            .query_map(args, map_delay)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(delays)
    }

    pub fn insert(&self, delay: &JobDelay) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO job_delay (id, scenario_id, job_id, name, duration, insert_after, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                delay.id,
                delay.scenario_id,
                delay.job_id,
                delay.name,
                delay.duration,
                delay.insert_after,
                delay.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<JobDelay>> {
        let conn = self.get_conn()?;
        let delay = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                map_delay,
            )
            .optional()?;
        Ok(delay)
    }

    /// 全部延误 (生产 + 各情景)
    pub fn list_all(&self) -> RepositoryResult<Vec<JobDelay>> {
        self.query("", &[])
    }

    /// 生产延误
    pub fn list_production(&self) -> RepositoryResult<Vec<JobDelay>> {
        self.query("WHERE scenario_id IS NULL", &[])
    }

    /// 情景可见的延误: 生产延误 + 该情景延误
    pub fn list_visible_in(&self, scenario_id: &str) -> RepositoryResult<Vec<JobDelay>> {
        self.query("WHERE scenario_id IS NULL OR scenario_id = ?1", &[&scenario_id as &dyn rusqlite::ToSql])
    }

    pub fn list_for_job(&self, job_id: &str) -> RepositoryResult<Vec<JobDelay>> {
        self.query("WHERE job_id = ?1", &[&job_id as &dyn rusqlite::ToSql])
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM job_delay WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}
