// ==========================================
// 齐套作业排产系统 - 作业仓储
// ==========================================
// 职责: 管理 job 表
// 存储: route_steps / allowed_shift_ids 以 JSON 文本保存
// 说明: 行级读写函数接收 &Connection，既供仓储使用，
//       也供情景提交事务内的 TxJobStore 使用
// 红线: 派生时长由调用方在写入前重算，仓储不含业务逻辑
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::job::{Job, RouteStep};
use crate::domain::shift::{format_hhmm, parse_hhmm};
use crate::engine::error::EngineResult;
use crate::engine::scenario_diff::JobStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "SELECT id, job_number, customer, description, ordered_quantity, \
     route_steps, setup, make_ready, take_down, station_count, scheduled_date, \
     scheduled_start_time, allowed_shift_ids, include_weekends, expected_kit_duration, \
     expected_job_duration FROM job";

/// job 表原始行
struct JobRow {
    id: String,
    job_number: String,
    customer: String,
    description: String,
    ordered_quantity: u32,
    route_steps: String,
    setup: i64,
    make_ready: i64,
    take_down: i64,
    station_count: u32,
    scheduled_date: Option<NaiveDate>,
    scheduled_start_time: Option<String>,
    allowed_shift_ids: String,
    include_weekends: bool,
    expected_kit_duration: i64,
    expected_job_duration: i64,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            job_number: row.get(1)?,
            customer: row.get(2)?,
            description: row.get(3)?,
            ordered_quantity: row.get(4)?,
            route_steps: row.get(5)?,
            setup: row.get(6)?,
            make_ready: row.get(7)?,
            take_down: row.get(8)?,
            station_count: row.get(9)?,
            scheduled_date: row.get(10)?,
            scheduled_start_time: row.get(11)?,
            allowed_shift_ids: row.get(12)?,
            include_weekends: row.get(13)?,
            expected_kit_duration: row.get(14)?,
            expected_job_duration: row.get(15)?,
        })
    }

    fn into_job(self) -> RepositoryResult<Job> {
        let route_steps: Vec<RouteStep> = serde_json::from_str(&self.route_steps)?;
        let allowed_shift_ids: Vec<String> = serde_json::from_str(&self.allowed_shift_ids)?;
        let scheduled_start_time = match self.scheduled_start_time.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                Some(parse_hhmm(raw).map_err(|e| RepositoryError::FieldValueError {
                    field: "scheduled_start_time".to_string(),
                    message: e.to_string(),
                })?)
            }
            _ => None,
        };

        Ok(Job {
            id: self.id,
            job_number: self.job_number,
            customer: self.customer,
            description: self.description,
            ordered_quantity: self.ordered_quantity,
            route_steps,
            setup: self.setup,
            make_ready: self.make_ready,
            take_down: self.take_down,
            station_count: self.station_count,
            scheduled_date: self.scheduled_date,
            scheduled_start_time,
            allowed_shift_ids,
            include_weekends: self.include_weekends,
            expected_kit_duration: self.expected_kit_duration,
            expected_job_duration: self.expected_job_duration,
        })
    }
}

// ==========================================
// 行级读写 (连接或事务内)
// ==========================================

pub(crate) fn find_job_in(conn: &Connection, id: &str) -> RepositoryResult<Option<Job>> {
    let row = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            JobRow::from_row,
        )
        .optional()?;
    row.map(JobRow::into_job).transpose()
}

pub(crate) fn list_jobs_in(conn: &Connection) -> RepositoryResult<Vec<Job>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY scheduled_date IS NULL, scheduled_date, scheduled_start_time, id",
        SELECT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], JobRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(JobRow::into_job).collect()
}

pub(crate) fn insert_job_in(conn: &Connection, job: &Job) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO job (
            id, job_number, customer, description, ordered_quantity, route_steps,
            setup, make_ready, take_down, station_count, scheduled_date,
            scheduled_start_time, allowed_shift_ids, include_weekends,
            expected_kit_duration, expected_job_duration
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
        params![
            job.id,
            job.job_number,
            job.customer,
            job.description,
            job.ordered_quantity,
            serde_json::to_string(&job.route_steps)?,
            job.setup,
            job.make_ready,
            job.take_down,
            job.station_count,
            job.scheduled_date,
            job.scheduled_start_time.map(format_hhmm),
            serde_json::to_string(&job.allowed_shift_ids)?,
            job.include_weekends,
            job.expected_kit_duration,
            job.expected_job_duration,
        ],
    )?;
    Ok(())
}

pub(crate) fn update_job_in(conn: &Connection, job: &Job) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"
        UPDATE job SET
            job_number = ?2, customer = ?3, description = ?4, ordered_quantity = ?5,
            route_steps = ?6, setup = ?7, make_ready = ?8, take_down = ?9,
            station_count = ?10, scheduled_date = ?11, scheduled_start_time = ?12,
            allowed_shift_ids = ?13, include_weekends = ?14,
            expected_kit_duration = ?15, expected_job_duration = ?16,
            updated_at = datetime('now')
        WHERE id = ?1
        "#,
        params![
            job.id,
            job.job_number,
            job.customer,
            job.description,
            job.ordered_quantity,
            serde_json::to_string(&job.route_steps)?,
            job.setup,
            job.make_ready,
            job.take_down,
            job.station_count,
            job.scheduled_date,
            job.scheduled_start_time.map(format_hhmm),
            serde_json::to_string(&job.allowed_shift_ids)?,
            job.include_weekends,
            job.expected_kit_duration,
            job.expected_job_duration,
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Job".to_string(),
            id: job.id.clone(),
        });
    }
    Ok(())
}

pub(crate) fn delete_job_in(conn: &Connection, id: &str) -> RepositoryResult<bool> {
    let affected = conn.execute("DELETE FROM job WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

// ==========================================
// TxJobStore - 事务内的作业存储
// ==========================================
// 传入 &Transaction (解引用为 &Connection)；事务未提交即回滚
pub struct TxJobStore<'a> {
    conn: &'a Connection,
}

impl<'a> TxJobStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl JobStore for TxJobStore<'_> {
    fn find_job(&self, job_id: &str) -> EngineResult<Option<Job>> {
        Ok(find_job_in(self.conn, job_id)?)
    }

    fn insert_job(&mut self, job: &Job) -> EngineResult<()> {
        Ok(insert_job_in(self.conn, job)?)
    }

    fn update_job(&mut self, job: &Job) -> EngineResult<()> {
        Ok(update_job_in(self.conn, job)?)
    }

    fn delete_job(&mut self, job_id: &str) -> EngineResult<bool> {
        Ok(delete_job_in(self.conn, job_id)?)
    }
}

// ==========================================
// JobRepository - 作业仓储
// ==========================================
pub struct JobRepository {
    conn: Arc<Mutex<Connection>>,
}

impl JobRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 全部作业 (已排产在前，按锚点排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Job>> {
        let conn = self.get_conn()?;
        list_jobs_in(&conn)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Job>> {
        let conn = self.get_conn()?;
        find_job_in(&conn, id)
    }

    pub fn insert(&self, job: &Job) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_job_in(&conn, job)
    }

    pub fn update(&self, job: &Job) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update_job_in(&conn, job)
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        delete_job_in(&conn, id)
    }
}
