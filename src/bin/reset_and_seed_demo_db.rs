// ==========================================
// 演示数据库重置与种子数据
// ==========================================
// 用法: reset_and_seed_demo_db [db_path] [job_count]
// 旧库先备份为 <db_path>.bak.<时间戳> 再删除
// ==========================================

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime};
use serde_json::json;
use std::error::Error;
use std::fs;
use std::path::Path;

use kitting_aps::api::NewDelayRequest;
use kitting_aps::app::{get_default_db_path, AppState};
use kitting_aps::domain::{Job, JobPatch, RouteStep, Shift};

const DEFAULT_JOB_COUNT: usize = 12;

fn main() -> Result<(), Box<dyn Error>> {
    kitting_aps::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    let job_count = std::env::args()
        .nth(2)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_JOB_COUNT)
        .max(1);

    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;
    seed_shifts(&state)?;
    let job_ids = seed_jobs(&state, job_count)?;
    seed_scenario(&state, &job_ids)?;

    print_quick_counts(&state)?;
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_shifts(state: &AppState) -> Result<(), Box<dyn Error>> {
    let mut day = Shift::new("S-DAY", "白班", "07:00", "15:00")?.with_break("11:00", 30)?;
    day.order = 1;
    day.color = Some("#4caf50".to_string());

    let mut swing = Shift::new("S-SWING", "中班", "15:00", "23:00")?.with_break("19:00", 30)?;
    swing.order = 2;
    swing.color = Some("#2196f3".to_string());

    let mut night = Shift::new("S-NIGHT", "夜班", "23:00", "07:00")?.with_break("03:00", 30)?;
    night.order = 3;
    night.is_active = false;
    night.color = Some("#9c27b0".to_string());

    for shift in [day, swing, night] {
        state.shift_api.create_shift(shift)?;
    }
    Ok(())
}

fn next_monday(from: NaiveDate) -> NaiveDate {
    let offset = (7 - from.weekday().num_days_from_monday()) % 7;
    from + Duration::days(i64::from(offset))
}

fn seed_jobs(state: &AppState, job_count: usize) -> Result<Vec<String>, Box<dyn Error>> {
    let base_date = next_monday(Local::now().date_naive());
    let start = NaiveTime::from_hms_opt(7, 0, 0);

    let mut ids = Vec::with_capacity(job_count);
    for i in 0..job_count {
        let job = Job {
            id: format!("J{:04}", i + 1),
            job_number: format!("KIT-{:05}", 10_000 + i),
            customer: ["华东装配", "北方整机", "南方电控"][i % 3].to_string(),
            description: format!("齐套作业 #{}", i + 1),
            ordered_quantity: 20 + (i as u32 % 5) * 10,
            route_steps: vec![
                RouteStep::new("拣料", 30, 1),
                RouteStep::new("配套", 45, 2),
                RouteStep::new("复核", 60, 3),
            ],
            setup: 600,
            make_ready: 120,
            take_down: 300,
            station_count: 1 + (i as u32 % 3),
            scheduled_date: Some(base_date + Duration::days((i / 3) as i64)),
            scheduled_start_time: start,
            allowed_shift_ids: if i % 4 == 0 { vec!["S-DAY".to_string()] } else { Vec::new() },
            include_weekends: i % 5 == 0,
            ..Job::default()
        };
        let job = state.job_api.create_job(job)?;
        ids.push(job.id);
    }

    if let Some(first) = ids.first() {
        state.job_api.add_delay(NewDelayRequest {
            job_id: first.clone(),
            scenario_id: None,
            name: "缺料等待".to_string(),
            duration: 1_800,
            insert_after: 1,
        })?;
    }
    Ok(ids)
}

fn seed_scenario(state: &AppState, job_ids: &[String]) -> Result<(), Box<dyn Error>> {
    let Some(source) = job_ids.first() else {
        return Ok(());
    };
    let scenario = state.scenario_api.create_scenario(
        "加开工位",
        Some("首个作业工位数加到 4".to_string()),
        Some(source.as_str()),
    )?;

    let mut patch = JobPatch::new();
    patch.insert("station_count".to_string(), json!(4));
    state.scenario_api.modify_job(&scenario.id, source, patch)?;

    if let Some(victim) = job_ids.get(1) {
        state.scenario_api.delete_job(&scenario.id, victim)?;
    }
    Ok(())
}

fn print_quick_counts(state: &AppState) -> Result<(), Box<dyn Error>> {
    let shifts = state.shift_api.list_shifts()?.len();
    let jobs = state.job_api.list_jobs()?.len();
    let scenarios = state.scenario_api.list_scenarios()?.len();
    let calendars = state.calendar_api.production_calendar()?.calendars.len();

    eprintln!("Seeded {}", state.db_path);
    eprintln!("  shifts:    {}", shifts);
    eprintln!("  jobs:      {}", jobs);
    eprintln!("  scenarios: {}", scenarios);
    eprintln!("  calendars: {}", calendars);
    Ok(())
}
