// ==========================================
// 班次管理与级联重算集成测试
// ==========================================
// 测试范围:
// 1. 班次校验 (休息越界、24h 班次)
// 2. 启停级联: 依赖作业重算、事件发布、锚点不变
// 3. 事件总线订阅
// ==========================================

mod test_helpers;

use kitting_aps::api::ApiError;
use kitting_aps::config::config_keys;
use kitting_aps::domain::Shift;
use kitting_aps::engine::ScheduleEventType;
use test_helpers::*;

fn cascade_env() -> TestEnv {
    let env = TestEnv::new()
        .expect("无法创建测试环境")
        .with_standard_shifts()
        .unwrap();
    let jobs = &env.state.job_api;
    jobs.create_job(JobBuilder::fixed("J-ALL", 3_600).scheduled(monday(), 7, 0).build())
        .unwrap();
    jobs.create_job(
        JobBuilder::fixed("J-DAY", 3_600)
            .scheduled(monday(), 7, 0)
            .allowed(&["S-DAY"])
            .build(),
    )
    .unwrap();
    jobs.create_job(
        JobBuilder::fixed("J-SWING", 3_600)
            .scheduled(monday(), 15, 0)
            .allowed(&["S-SWING"])
            .build(),
    )
    .unwrap();
    jobs.create_job(JobBuilder::fixed("J-IDLE", 3_600).build()).unwrap();
    env
}

#[test]
fn test_班次校验_休息超出班次() {
    let env = TestEnv::new().expect("无法创建测试环境");

    let bad = Shift::new("S-BAD", "坏班次", "07:00", "08:00")
        .unwrap()
        .with_break("07:30", 60)
        .unwrap();
    let err = env.state.shift_api.create_shift(bad).unwrap_err();
    assert!(matches!(err, ApiError::ConfigurationError(_)));

    // 起止相同视为跨夜 24h
    let full_day = Shift::new("S-24", "全天", "07:00", "07:00").unwrap();
    assert!(env.state.shift_api.create_shift(full_day).is_ok());
    assert!((env.state.shift_api.productive_hours("S-24").unwrap() - 24.0).abs() < 1e-9);
}

#[test]
fn test_新建班次_自动分配ID() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let mut shift = swing_shift();
    shift.id = String::new();

    let created = env.state.shift_api.create_shift(shift).unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(env.state.shift_api.get_shift(&created.id).unwrap().name, "中班");
}

#[test]
fn test_停用班次_级联重算依赖作业() {
    let env = cascade_env();
    let events = env.state.event_bus.subscribe().expect("订阅失败");

    let cascade = env
        .state
        .shift_api
        .set_shift_active("S-SWING", false)
        .expect("停用失败");

    let mut affected = cascade.affected_job_ids.clone();
    affected.sort();
    assert_eq!(affected, vec!["J-ALL".to_string(), "J-SWING".to_string()]);

    // 仅允许中班的作业失去全部班次，按 24/7 计算
    let swing = cascade
        .calendars
        .iter()
        .find(|c| c.job_id == "J-SWING")
        .unwrap();
    assert!(swing.continuous_fallback);
    assert_eq!(swing.end, at(monday(), 16, 0));

    // 锚点不变
    let job = env.state.job_api.get_job("J-SWING").unwrap();
    assert_eq!(job.scheduled_date, Some(monday()));
    assert_eq!(job.scheduled_start_time, Some(hm(15, 0)));

    let event = events.try_recv().expect("应收到事件");
    assert_eq!(event.event_type, ScheduleEventType::ShiftChanged);
    let mut ids = event.affected_job_ids.unwrap();
    ids.sort();
    assert_eq!(ids, affected);
}

#[test]
fn test_禁用回退时停用班次_写入生效并发布事件() {
    let env = cascade_env();
    env.state
        .config_api
        .update_config(config_keys::ALLOW_CONTINUOUS_FALLBACK, "false")
        .unwrap();
    let events = env.state.event_bus.subscribe().expect("订阅失败");

    // J-SWING 只允许中班，停用后无可用班次且不允许回退
    let cascade = env
        .state
        .shift_api
        .set_shift_active("S-SWING", false)
        .expect("班次写入不应因级联失败而报错");

    assert!(!env.state.shift_api.get_shift("S-SWING").unwrap().is_active);
    assert!(!cascade.is_clean());
    let failed: Vec<&str> = cascade.failures.iter().map(|f| f.job_id.as_str()).collect();
    assert_eq!(failed, vec!["J-SWING"]);
    // J-ALL 仍可落到白班
    assert!(cascade.calendars.iter().any(|c| c.job_id == "J-ALL"));

    let event = events.try_recv().expect("应收到事件");
    assert_eq!(event.event_type, ScheduleEventType::ShiftChanged);
    assert!(event.affected_job_ids.unwrap().contains(&"J-SWING".to_string()));
}

#[test]
fn test_停用班次后_生产日历同步变化() {
    let env = cascade_env();

    // 白班停用前: J-ALL 在 07:00-08:00
    let before = env.state.calendar_api.production_calendar().unwrap();
    assert_eq!(before.find("J-ALL").unwrap().end, at(monday(), 8, 0));

    env.state.shift_api.set_shift_active("S-DAY", false).unwrap();

    // 白班停用后: J-ALL 推到中班 15:00-16:00
    let after = env.state.calendar_api.production_calendar().unwrap();
    assert_eq!(after.find("J-ALL").unwrap().start, at(monday(), 15, 0));
    assert_eq!(after.find("J-ALL").unwrap().end, at(monday(), 16, 0));
}

#[test]
fn test_删除班次() {
    let env = cascade_env();

    let cascade = env.state.shift_api.delete_shift("S-DAY").unwrap();
    let mut affected = cascade.affected_job_ids;
    affected.sort();
    assert_eq!(affected, vec!["J-ALL".to_string(), "J-DAY".to_string()]);

    let err = env.state.shift_api.delete_shift("S-DAY").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(env.state.shift_api.list_shifts().unwrap().len(), 1);
}

#[test]
fn test_修改班次_校验并级联() {
    let env = cascade_env();

    let mut day = env.state.shift_api.get_shift("S-DAY").unwrap();
    day.break_start = None;
    day.break_duration_min = None;
    day.end_time = hm(9, 0);
    let cascade = env.state.shift_api.update_shift(day.clone()).unwrap();
    assert!(cascade.affected_job_ids.contains(&"J-DAY".to_string()));
    assert!((env.state.shift_api.productive_hours("S-DAY").unwrap() - 2.0).abs() < 1e-9);

    day.break_start = Some(hm(8, 0));
    day.break_duration_min = Some(120);
    let err = env.state.shift_api.update_shift(day).unwrap_err();
    assert!(matches!(err, ApiError::ConfigurationError(_)));
}

#[test]
fn test_事件总线_每个写操作发布一条事件() {
    let env = TestEnv::new().expect("无法创建测试环境");
    let events = env.state.event_bus.subscribe().unwrap();

    env.state.shift_api.create_shift(day_shift()).unwrap();
    env.state
        .job_api
        .create_job(JobBuilder::fixed("J1", 60).build())
        .unwrap();
    let scenario = env.state.scenario_api.create_scenario("S", None, None).unwrap();
    env.state.scenario_api.discard(&scenario.id).unwrap();

    let types: Vec<ScheduleEventType> = events.try_iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            ScheduleEventType::ShiftChanged,
            ScheduleEventType::JobChanged,
            ScheduleEventType::ScenarioChanged,
            ScheduleEventType::ScenarioDiscarded,
        ]
    );
}
