// ==========================================
// 情景提交原子性测试
// ==========================================
// 红线: 第 N 条变更失败时，前 N-1 条变更在作业存储中均不可见
// ==========================================

mod test_helpers;

use kitting_aps::api::{ApiError, NewDelayRequest};
use serde_json::json;
use test_helpers::*;

fn patch(value: serde_json::Value) -> kitting_aps::domain::JobPatch {
    value.as_object().cloned().unwrap()
}

fn seeded_env() -> TestEnv {
    let env = TestEnv::new().expect("无法创建测试环境");
    for id in ["J1", "J2"] {
        env.state
            .job_api
            .create_job(JobBuilder::kitting_example(id).scheduled(monday(), 7, 0).build())
            .unwrap();
    }
    env
}

#[test]
fn test_引用已删除作业_整体回滚() {
    let env = seeded_env();
    let api = &env.state.scenario_api;
    let scenario = api.create_scenario("原子性", None, None).unwrap();

    api.modify_job(&scenario.id, "J1", patch(json!({"station_count": 1})))
        .unwrap();
    api.add_job(&scenario.id, patch(json!({"id": "J-NEW", "setup": 60})))
        .unwrap();
    api.modify_job(&scenario.id, "J2", patch(json!({"ordered_quantity": 99})))
        .unwrap();
    env.state
        .job_api
        .add_delay(NewDelayRequest {
            job_id: "J1".to_string(),
            scenario_id: Some(scenario.id.clone()),
            name: "假设延误".to_string(),
            duration: 300,
            insert_after: 0,
        })
        .unwrap();

    // 情景录入之后，J2 在生产中被删除
    env.state.job_api.delete_job("J2").unwrap();

    let err = api.commit(&scenario.id).unwrap_err();
    assert!(matches!(err, ApiError::ReferenceError(_)), "实际错误: {:?}", err);

    // 前两条变更均未生效
    let j1 = env.state.job_api.get_job("J1").unwrap();
    assert_eq!(j1.station_count, 2);
    assert_eq!(j1.expected_job_duration, 1_695);
    assert!(env.state.job_api.get_job("J-NEW").is_err());

    // 情景与其变更、情景延误保持原状
    assert_eq!(api.list_changes(&scenario.id).unwrap().len(), 3);
    let delays = env.state.job_api.list_delays("J1").unwrap();
    assert_eq!(delays.len(), 1);
    assert_eq!(delays[0].scenario_id.as_deref(), Some(scenario.id.as_str()));
}

#[test]
fn test_无效补丁_叠加跳过但提交失败() {
    let env = seeded_env();
    let api = &env.state.scenario_api;
    let scenario = api.create_scenario("类型错误", None, None).unwrap();

    api.delete_job(&scenario.id, "J2").unwrap();
    api.modify_job(&scenario.id, "J1", patch(json!({"station_count": "many"})))
        .unwrap();

    // 叠加视图宽松: 无效补丁被跳过，J1 保持未触及
    let overlay = api.overlay(&scenario.id).unwrap();
    let j1 = overlay.iter().find(|o| o.job.id == "J1").unwrap();
    assert!(!j1.is_touched());

    // 提交严格: 整体失败
    let err = api.commit(&scenario.id).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "实际错误: {:?}", err);
    assert!(env.state.job_api.get_job("J2").is_ok());
}

#[test]
fn test_新增作业ID冲突_整体回滚() {
    let env = seeded_env();
    let api = &env.state.scenario_api;
    let scenario = api.create_scenario("冲突", None, None).unwrap();

    api.delete_job(&scenario.id, "J1").unwrap();
    api.add_job(&scenario.id, patch(json!({"id": "J-X", "setup": 60})))
        .unwrap();

    // 情景录入之后，生产中出现同ID作业
    env.state
        .job_api
        .create_job(JobBuilder::fixed("J-X", 10).build())
        .unwrap();

    assert!(api.commit(&scenario.id).is_err());
    assert!(env.state.job_api.get_job("J1").is_ok());
    assert_eq!(env.state.job_api.get_job("J-X").unwrap().expected_job_duration, 10);
}

#[test]
fn test_新增作业ID与叠加视图冲突_录入即拒绝() {
    let env = seeded_env();
    let api = &env.state.scenario_api;
    let scenario = api.create_scenario("重复", None, None).unwrap();

    let err = api
        .add_job(&scenario.id, patch(json!({"id": "J1"})))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}
