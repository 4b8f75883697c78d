// ==========================================
// 齐套作业排产系统 - 作业补丁应用
// ==========================================
// 情景变更的 change_data 是自由键值补丁，在此按作业结构校验:
// 补丁合并到作业的序列化形式后再反序列化
// 拒绝: 未知字段、修改 id、类型不匹配
// 应用后必须重算派生时长
// ==========================================

use crate::domain::job::Job;
use crate::domain::scenario::JobPatch;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::station;
use serde_json::Value;

/// 作业序列化为补丁形式 (用于 original_data 快照与情景种子)
pub fn job_to_patch(job: &Job) -> EngineResult<JobPatch> {
    match serde_json::to_value(job) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(EngineError::InvalidPatch(format!(
            "作业序列化结果不是对象: {}",
            other
        ))),
        Err(e) => Err(EngineError::InvalidPatch(e.to_string())),
    }
}

/// 将补丁应用到作业上，返回重算后的新作业
pub fn apply_patch(job: &Job, patch: &JobPatch) -> EngineResult<Job> {
    let mut fields = job_to_patch(job)?;

    for (key, value) in patch {
        if !fields.contains_key(key) {
            return Err(EngineError::InvalidPatch(format!("未知字段: {}", key)));
        }
        if key == "id" && value.as_str() != Some(job.id.as_str()) {
            return Err(EngineError::InvalidPatch(format!(
                "不允许修改作业ID: {} -> {}",
                job.id, value
            )));
        }
        fields.insert(key.clone(), value.clone());
    }

    let mut patched: Job = serde_json::from_value(Value::Object(fields))
        .map_err(|e| EngineError::InvalidPatch(e.to_string()))?;
    station::recalculate(&mut patched)?;
    Ok(patched)
}

/// 由完整载荷构造新作业 (ADD 变更)
///
/// 缺省字段取默认值；载荷未给出 id 时使用 fallback_id
pub fn job_from_payload(payload: &JobPatch, fallback_id: &str) -> EngineResult<Job> {
    let template = job_to_patch(&Job::default())?;
    if let Some(key) = payload.keys().find(|k| !template.contains_key(*k)) {
        return Err(EngineError::InvalidPatch(format!("未知字段: {}", key)));
    }

    let mut job: Job = serde_json::from_value(Value::Object(payload.clone()))
        .map_err(|e| EngineError::InvalidPatch(e.to_string()))?;
    if job.id.trim().is_empty() {
        job.id = fallback_id.to_string();
    }
    station::recalculate(&mut job)?;
    Ok(job)
}

/// 浅合并: 后写覆盖同名字段
pub fn merge_patch(base: &mut JobPatch, newer: &JobPatch) {
    for (key, value) in newer {
        base.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::RouteStep;
    use serde_json::json;

    fn patch(value: Value) -> JobPatch {
        match value {
            Value::Object(map) => map,
            _ => panic!("patch must be an object"),
        }
    }

    fn base_job() -> Job {
        let mut job = Job {
            route_steps: vec![RouteStep::new("拣料", 60, 1)],
            ordered_quantity: 10,
            ..Job::new("J1")
        };
        station::recalculate(&mut job).unwrap();
        job
    }

    #[test]
    fn test_patch_recalculates_duration() {
        let job = base_job();
        assert_eq!(job.expected_job_duration, 600);

        let patched = apply_patch(&job, &patch(json!({"station_count": 4}))).unwrap();
        assert_eq!(patched.station_count, 4);
        assert_eq!(patched.expected_job_duration, 150);
        // 原作业不变
        assert_eq!(job.station_count, 1);
    }

    #[test]
    fn test_patch_schedule_anchor() {
        let patched = apply_patch(
            &base_job(),
            &patch(json!({"scheduled_date": "2024-03-05", "scheduled_start_time": "13:30"})),
        )
        .unwrap();
        assert_eq!(
            patched.scheduled_start().map(|t| t.to_string()),
            Some("2024-03-05 13:30:00".to_string())
        );
    }

    #[test]
    fn test_rejects_unknown_field_id_change_and_type_mismatch() {
        let job = base_job();
        assert!(matches!(
            apply_patch(&job, &patch(json!({"colour": "red"}))),
            Err(EngineError::InvalidPatch(_))
        ));
        assert!(matches!(
            apply_patch(&job, &patch(json!({"id": "J2"}))),
            Err(EngineError::InvalidPatch(_))
        ));
        assert!(matches!(
            apply_patch(&job, &patch(json!({"ordered_quantity": "many"}))),
            Err(EngineError::InvalidPatch(_))
        ));
        // 与原值相同的 id 允许出现 (情景种子镜像整个作业)
        assert!(apply_patch(&job, &patch(json!({"id": "J1"}))).is_ok());
    }

    #[test]
    fn test_job_from_payload_uses_fallback_id() {
        let job = job_from_payload(
            &patch(json!({"job_number": "K-100", "route_steps": [{"name": "拣料", "expected_seconds": 20, "order": 1}], "ordered_quantity": 3})),
            "pending-7",
        )
        .unwrap();
        assert_eq!(job.id, "pending-7");
        assert_eq!(job.expected_job_duration, 60);
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut base = patch(json!({"ordered_quantity": 5, "customer": "A"}));
        merge_patch(&mut base, &patch(json!({"ordered_quantity": 8, "setup": 60})));
        assert_eq!(base["ordered_quantity"], 8);
        assert_eq!(base["customer"], "A");
        assert_eq!(base["setup"], 60);
    }
}
