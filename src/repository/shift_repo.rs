// ==========================================
// 齐套作业排产系统 - 班次仓储
// ==========================================
// 职责: 管理 shift 表
// 存储: 时刻按 "HH:MM" 文本保存
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::shift::{format_hhmm, parse_hhmm, Shift};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// shift 表原始行
struct ShiftRow {
    id: String,
    name: String,
    start_time: String,
    end_time: String,
    break_start: Option<String>,
    break_duration_min: Option<u32>,
    is_active: bool,
    sort_order: i32,
    color: Option<String>,
}

impl ShiftRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            break_start: row.get(4)?,
            break_duration_min: row.get(5)?,
            is_active: row.get(6)?,
            sort_order: row.get(7)?,
            color: row.get(8)?,
        })
    }

    fn into_shift(self) -> RepositoryResult<Shift> {
        let parse = |field: &str, raw: &str| {
            parse_hhmm(raw).map_err(|e| RepositoryError::FieldValueError {
                field: field.to_string(),
                message: e.to_string(),
            })
        };
        Ok(Shift {
            start_time: parse("start_time", &self.start_time)?,
            end_time: parse("end_time", &self.end_time)?,
            break_start: match self.break_start.as_deref() {
                Some(raw) if !raw.trim().is_empty() => Some(parse("break_start", raw)?),
                _ => None,
            },
            id: self.id,
            name: self.name,
            break_duration_min: self.break_duration_min,
            is_active: self.is_active,
            order: self.sort_order,
            color: self.color,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, start_time, end_time, break_start, \
     break_duration_min, is_active, sort_order, color FROM shift";

// ==========================================
// ShiftRepository - 班次仓储
// ==========================================
pub struct ShiftRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShiftRepository {
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

    /// 全部班次，按 order、开始时刻排序
    pub fn list_all(&self) -> RepositoryResult<Vec<Shift>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY sort_order, start_time, id", SELECT_COLUMNS))?;
        let rows = stmt
            .query_map([], ShiftRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ShiftRow::into_shift).collect()
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Shift>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                ShiftRow::from_row,
            )
            .optional()?;
        row.map(ShiftRow::into_shift).transpose()
    }

    pub fn insert(&self, shift: &Shift) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shift (
                id, name, start_time, end_time, break_start,
                break_duration_min, is_active, sort_order, color
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                shift.id,
                shift.name,
                format_hhmm(shift.start_time),
                format_hhmm(shift.end_time),
                shift.break_start.map(format_hhmm),
                shift.break_duration_min,
                shift.is_active,
                shift.order,
                shift.color,
            ],
        )?;
        Ok(())
    }

    pub fn update(&self, shift: &Shift) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE shift SET
                name = ?2, start_time = ?3, end_time = ?4, break_start = ?5,
                break_duration_min = ?6, is_active = ?7, sort_order = ?8, color = ?9
            WHERE id = ?1
            "#,
            params![
                shift.id,
                shift.name,
                format_hhmm(shift.start_time),
                format_hhmm(shift.end_time),
                shift.break_start.map(format_hhmm),
                shift.break_duration_min,
                shift.is_active,
                shift.order,
                shift.color,
            ],
        )?;
        if affected == 0 {
            return Err(not_found(&shift.id));
        }
        Ok(())
    }

    /// 切换启用状态
    pub fn set_active(&self, id: &str, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE shift SET is_active = ?2 WHERE id = ?1",
            params![id, is_active],
        )?;
        if affected == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM shift WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn not_found(id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Shift".to_string(),
        id: id.to_string(),
    }
}
