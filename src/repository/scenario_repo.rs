// ==========================================
// 齐套作业排产系统 - 情景仓储
// ==========================================
// 职责: 管理 scenario / scenario_change 表
// 原子操作 (单事务):
// - activate: 先全部取消激活，再激活目标情景
// - add_change: 同一 (情景, 作业) 的 MODIFY 合并到已有记录
// - commit: 回放全部变更 -> 情景延误转生产 -> 删除情景；任一失败整体回滚
// - discard: 删除情景 (变更与情景延误级联删除)
// ==========================================

use crate::domain::scenario::{JobPatch, NewScenarioChange, Scenario, ScenarioChange};
use crate::domain::types::ChangeOperation;
use crate::engine::scenario_diff::{merge_modify_change, replay_changes, CommitSummary};
use crate::repository::delay_repo::promote_scenario_delays_in;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::job_repo::TxJobStore;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::instrument;

const SCENARIO_COLUMNS: &str =
    "SELECT id, name, description, is_active, created_at, updated_at FROM scenario";

const CHANGE_COLUMNS: &str = "SELECT id, scenario_id, job_id, operation, change_data, \
     original_data, created_at FROM scenario_change";

fn map_scenario(row: &Row<'_>) -> rusqlite::Result<Scenario> {
    Ok(Scenario {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// scenario_change 原始行
struct ChangeRow {
    id: i64,
    scenario_id: String,
    job_id: Option<String>,
    operation: String,
    change_data: String,
    original_data: Option<String>,
    created_at: NaiveDateTime,
}

impl ChangeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scenario_id: row.get(1)?,
            job_id: row.get(2)?,
            operation: row.get(3)?,
            change_data: row.get(4)?,
            original_data: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_change(self) -> RepositoryResult<ScenarioChange> {
        let operation = ChangeOperation::from_db_str(&self.operation).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "operation".to_string(),
                message: format!("未知的变更操作: {}", self.operation),
            }
        })?;
        let change_data: JobPatch = serde_json::from_str(&self.change_data)?;
        let original_data: Option<JobPatch> = match self.original_data.as_deref() {
            Some(raw) => Some(serde_json::from_str(raw)?),
            None => None,
        };
        Ok(ScenarioChange {
            id: self.id,
            scenario_id: self.scenario_id,
            job_id: self.job_id,
            operation,
            change_data,
            original_data,
            created_at: self.created_at,
        })
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn scenario_not_found(id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Scenario".to_string(),
        id: id.to_string(),
    }
}

fn find_scenario_in(conn: &Connection, id: &str) -> RepositoryResult<Option<Scenario>> {
    let scenario = conn
        .query_row(
            &format!("{} WHERE id = ?1", SCENARIO_COLUMNS),
            params![id],
            map_scenario,
        )
        .optional()?;
    Ok(scenario)
}

fn list_changes_in(conn: &Connection, scenario_id: &str) -> RepositoryResult<Vec<ScenarioChange>> {
    let mut stmt = conn.prepare(&format!("{} WHERE scenario_id = ?1 ORDER BY id", CHANGE_COLUMNS))?;
    let rows = stmt
        .query_map(params![scenario_id], ChangeRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(ChangeRow::into_change).collect()
}

fn find_change_in(conn: &Connection, change_id: i64) -> RepositoryResult<ScenarioChange> {
    let row = conn.query_row(
        &format!("{} WHERE id = ?1", CHANGE_COLUMNS),
        params![change_id],
        ChangeRow::from_row,
    )?;
    row.into_change()
}

fn patch_to_text(patch: &JobPatch) -> RepositoryResult<String> {
    Ok(serde_json::to_string(patch)?)
}

fn optional_patch_to_text(patch: &Option<JobPatch>) -> RepositoryResult<Option<String>> {
    patch.as_ref().map(patch_to_text).transpose()
}

// ==========================================
// ScenarioRepository - 情景仓储
// ==========================================
pub struct ScenarioRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScenarioRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 情景
    // ==========================================

    pub fn create(&self, scenario: &Scenario) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO scenario (id, name, description, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            "#,
            params![
                scenario.id,
                scenario.name,
                scenario.description,
                scenario.created_at,
                scenario.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Scenario>> {
        let conn = self.get_conn()?;
        find_scenario_in(&conn, id)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Scenario>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY created_at, id", SCENARIO_COLUMNS))?;
        let scenarios = stmt
            .query_map([], map_scenario)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(scenarios)
    }

    /// 当前激活的情景 (至多一个)
    pub fn find_active(&self) -> RepositoryResult<Option<Scenario>> {
        let conn = self.get_conn()?;
        let scenario = conn
            .query_row(
                &format!("{} WHERE is_active = 1 LIMIT 1", SCENARIO_COLUMNS),
                [],
                map_scenario,
            )
            .optional()?;
        Ok(scenario)
    }

    /// 激活情景: 单事务内先全部取消，再激活目标
    pub fn activate(&self, id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE scenario SET is_active = 0 WHERE is_active = 1", [])?;
        let affected = tx.execute("UPDATE scenario SET is_active = 1 WHERE id = ?1", params![id])?;
        if affected == 0 {
            // tx 未提交即回滚，原激活状态保持不变
            return Err(scenario_not_found(id));
        }
        tx.commit()?;
        Ok(())
    }

    /// 取消全部激活 (回到生产视图)
    pub fn deactivate_all(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("UPDATE scenario SET is_active = 0 WHERE is_active = 1", [])?;
        Ok(())
    }

    // ==========================================
    // 变更
    // ==========================================

    /// 按回放顺序列出情景变更
    pub fn list_changes(&self, scenario_id: &str) -> RepositoryResult<Vec<ScenarioChange>> {
        let conn = self.get_conn()?;
        list_changes_in(&conn, scenario_id)
    }

    pub fn count_changes(&self, scenario_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scenario_change WHERE scenario_id = ?1",
            params![scenario_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 添加变更；MODIFY 与已有同作业 MODIFY 合并
    pub fn add_change(
        &self,
        scenario_id: &str,
        change: &NewScenarioChange,
    ) -> RepositoryResult<ScenarioChange> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if find_scenario_in(&tx, scenario_id)?.is_none() {
            return Err(scenario_not_found(scenario_id));
        }

        let existing_id: Option<i64> = match (&change.operation, &change.job_id) {
            (ChangeOperation::Modify, Some(job_id)) => tx
                .query_row(
                    "SELECT id FROM scenario_change \
                     WHERE scenario_id = ?1 AND job_id = ?2 AND operation = 'MODIFY' \
                     ORDER BY id LIMIT 1",
                    params![scenario_id, job_id],
                    |row| row.get(0),
                )
                .optional()?,
            _ => None,
        };

        let change_id = match existing_id {
            Some(id) => {
                let mut existing = find_change_in(&tx, id)?;
                merge_modify_change(&mut existing, change);
                tx.execute(
                    "UPDATE scenario_change SET change_data = ?2, original_data = ?3 WHERE id = ?1",
                    params![
                        id,
                        patch_to_text(&existing.change_data)?,
                        optional_patch_to_text(&existing.original_data)?,
                    ],
                )?;
                id
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO scenario_change (
                        scenario_id, job_id, operation, change_data, original_data, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        scenario_id,
                        change.job_id,
                        change.operation.to_db_str(),
                        patch_to_text(&change.change_data)?,
                        optional_patch_to_text(&change.original_data)?,
                        now(),
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.execute(
            "UPDATE scenario SET updated_at = ?2 WHERE id = ?1",
            params![scenario_id, now()],
        )?;
        let stored = find_change_in(&tx, change_id)?;
        tx.commit()?;
        Ok(stored)
    }

    /// 撤销单条变更 (只删除属于该情景的变更)
    pub fn remove_change(&self, scenario_id: &str, change_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM scenario_change WHERE id = ?1 AND scenario_id = ?2",
            params![change_id, scenario_id],
        )?;
        Ok(affected > 0)
    }

    // ==========================================
    // 终态转换
    // ==========================================

    /// 提交情景: 全部变更在单个事务内回放到作业表
    #[instrument(skip(self), fields(scenario_id = %scenario_id))]
    pub fn commit(&self, scenario_id: &str) -> RepositoryResult<CommitSummary> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if find_scenario_in(&tx, scenario_id)?.is_none() {
            return Err(scenario_not_found(scenario_id));
        }
        let changes = list_changes_in(&tx, scenario_id)?;

        let summary = {
            let mut store = TxJobStore::new(&tx);
            replay_changes(&mut store, &changes)?
        };
        let promoted = promote_scenario_delays_in(&tx, scenario_id)?;
        tx.execute("DELETE FROM scenario WHERE id = ?1", params![scenario_id])?;
        tx.commit()?;

        tracing::info!(
            changes = changes.len(),
            added = summary.added_job_ids.len(),
            modified = summary.modified_job_ids.len(),
            deleted = summary.deleted_job_ids.len(),
            promoted_delays = promoted,
            "情景已提交"
        );
        Ok(summary)
    }

    /// 丢弃情景: 不影响生产数据
    pub fn discard(&self, scenario_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM scenario WHERE id = ?1", params![scenario_id])?;
        if affected == 0 {
            return Err(scenario_not_found(scenario_id));
        }
        Ok(())
    }
}
