// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、班次/作业测试数据构建
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use kitting_aps::app::AppState;
use kitting_aps::db::{init_schema, open_sqlite_connection};
use kitting_aps::domain::{Job, RouteStep, Shift};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

// ==========================================
// TestEnv - 装配完整 AppState 的测试环境
// ==========================================
pub struct TestEnv {
    _temp_file: NamedTempFile,
    pub state: AppState,
}

impl TestEnv {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        kitting_aps::logging::init_test();
        let (temp_file, db_path) = create_test_db()?;
        let state = AppState::new(db_path)?;
        Ok(Self {
            _temp_file: temp_file,
            state,
        })
    }

    /// 创建白班 + 中班
    pub fn with_standard_shifts(self) -> Result<Self, Box<dyn Error>> {
        self.state.shift_api.create_shift(day_shift())?;
        self.state.shift_api.create_shift(swing_shift())?;
        Ok(self)
    }
}

// ==========================================
// 时间
// ==========================================

/// 2024-01-08 (周一)
pub fn monday() -> NaiveDate {
    date(2024, 1, 8)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    day.and_time(hm(h, m))
}

// ==========================================
// 班次
// ==========================================

/// 白班 07:00-15:00，11:00 休息 30 分钟 (有效 7.5h)
pub fn day_shift() -> Shift {
    Shift::new("S-DAY", "白班", "07:00", "15:00")
        .unwrap()
        .with_break("11:00", 30)
        .unwrap()
        .with_order(1)
}

/// 中班 15:00-23:00，无休息
pub fn swing_shift() -> Shift {
    Shift::new("S-SWING", "中班", "15:00", "23:00")
        .unwrap()
        .with_order(2)
}

/// 夜班 23:00-07:00 (跨夜)，无休息
pub fn night_shift() -> Shift {
    Shift::new("S-NIGHT", "夜班", "23:00", "07:00")
        .unwrap()
        .with_order(3)
}

// ==========================================
// JobBuilder - 作业构建器
// ==========================================
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: &str) -> Self {
        Self { job: Job::new(id) }
    }

    /// 3 步工艺 (30s/45s/60s)，数量 10，2 工位，准备 600 调机 120 收尾 300 => 1695s
    pub fn kitting_example(id: &str) -> Self {
        Self::new(id)
            .route(&[("拣料", 30), ("配套", 45), ("复核", 60)])
            .quantity(10)
            .stations(2)
            .overhead(600, 120, 300)
    }

    /// 仅由准备时间构成的固定时长作业
    pub fn fixed(id: &str, seconds: i64) -> Self {
        Self::new(id).overhead(seconds, 0, 0)
    }

    pub fn route(mut self, steps: &[(&str, i64)]) -> Self {
        self.job.route_steps = steps
            .iter()
            .enumerate()
            .map(|(i, (name, secs))| RouteStep::new(*name, *secs, i as u32 + 1))
            .collect();
        self
    }

    pub fn quantity(mut self, qty: u32) -> Self {
        self.job.ordered_quantity = qty;
        self
    }

    pub fn stations(mut self, stations: u32) -> Self {
        self.job.station_count = stations;
        self
    }

    pub fn overhead(mut self, setup: i64, make_ready: i64, take_down: i64) -> Self {
        self.job.setup = setup;
        self.job.make_ready = make_ready;
        self.job.take_down = take_down;
        self
    }

    pub fn scheduled(mut self, day: NaiveDate, h: u32, m: u32) -> Self {
        self.job.scheduled_date = Some(day);
        self.job.scheduled_start_time = Some(hm(h, m));
        self
    }

    pub fn allowed(mut self, shift_ids: &[&str]) -> Self {
        self.job.allowed_shift_ids = shift_ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn weekends(mut self, include: bool) -> Self {
        self.job.include_weekends = include;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}
