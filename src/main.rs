// ==========================================
// 齐套作业排产系统 - 主入口
// ==========================================
// 职责: 初始化日志、打开默认数据库、输出启动摘要
// 宿主进程 (桌面壳/服务) 通过库模式装配 AppState
// ==========================================

use anyhow::Context;

use kitting_aps::app::{get_default_db_path, AppState};

fn main() -> anyhow::Result<()> {
    kitting_aps::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", kitting_aps::APP_NAME);
    tracing::info!("系统版本: {}", kitting_aps::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).context("无法初始化AppState")?;
    log_startup_summary(&state)?;

    Ok(())
}

fn log_startup_summary(state: &AppState) -> anyhow::Result<()> {
    let shifts = state.shift_api.list_shifts()?;
    let active_shifts = shifts.iter().filter(|s| s.is_active).count();
    let jobs = state.job_api.list_jobs()?;
    let scheduled = jobs.iter().filter(|j| j.is_scheduled()).count();
    let active_scenario = state.scenario_api.get_active()?;

    tracing::info!(
        shifts = shifts.len(),
        active_shifts,
        jobs = jobs.len(),
        scheduled,
        "数据概况"
    );
    match active_scenario {
        Some(scenario) => tracing::info!(
            scenario_id = %scenario.id,
            name = %scenario.name,
            "当前激活情景"
        ),
        None => tracing::info!("当前为生产视图 (无激活情景)"),
    }

    for item in state.config_api.list_configs()? {
        tracing::info!(key = %item.key, value = %item.value, "配置项");
    }
    let config = state.config_api.scheduler_config()?;
    tracing::info!(
        allow_continuous_fallback = config.allow_continuous_fallback,
        lookahead_days = config.lookahead_days,
        day_end_cap = %config.day_end_cap,
        "排产引擎参数"
    );
    Ok(())
}
