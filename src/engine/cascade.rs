// ==========================================
// 齐套作业排产系统 - 班次启停级联重算
// ==========================================
// 触发: 班次 is_active 切换 / 班次时间修改
// 范围: 依赖该班次的已排产作业 (白名单为空 或 白名单包含该班次)
// 规则: 只重算派生的日历，不改动作业存储的排产锚点
// 规则: 单个作业重算失败不中断级联，记入 failures
// ==========================================

use crate::domain::calendar::JobCalendar;
use crate::domain::scenario::OverlayJob;
use crate::domain::shift::Shift;
use crate::engine::calendar_builder::CalendarBuilder;
use serde::{Deserialize, Serialize};

/// 单个作业的重算失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeFailure {
    pub job_id: String,
    pub reason: String,
}

/// 级联重算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftCascade {
    pub shift_id: String,
    pub affected_job_ids: Vec<String>,
    pub calendars: Vec<JobCalendar>,
    pub failures: Vec<CascadeFailure>,
}

impl ShiftCascade {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 找出依赖指定班次的已排产作业
pub fn dependent_job_ids(jobs: &[OverlayJob], shift_id: &str) -> Vec<String> {
    jobs.iter()
        .filter(|o| o.job.is_scheduled() && o.job.depends_on_shift(shift_id))
        .map(|o| o.job.id.clone())
        .collect()
}

/// 基于变更后的班次集合重算受影响作业的日历
pub fn cascade_shift_change(
    builder: &CalendarBuilder,
    jobs: &[OverlayJob],
    shifts: &[Shift],
    shift_id: &str,
) -> ShiftCascade {
    let affected_job_ids = dependent_job_ids(jobs, shift_id);

    let mut calendars = Vec::with_capacity(affected_job_ids.len());
    let mut failures = Vec::new();
    for overlay in jobs.iter().filter(|o| affected_job_ids.contains(&o.job.id)) {
        match builder.build(overlay, shifts) {
            Ok(Some(calendar)) => calendars.push(calendar),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    shift_id = %shift_id,
                    job_id = %overlay.job.id,
                    error = %e,
                    "级联重算失败，作业在当前班次配置下无法排产"
                );
                failures.push(CascadeFailure {
                    job_id: overlay.job.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        shift_id = %shift_id,
        affected = affected_job_ids.len(),
        failed = failures.len(),
        "班次变更级联重算完成"
    );

    ShiftCascade {
        shift_id: shift_id.to_string(),
        affected_job_ids,
        calendars,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{Job, RouteStep};
    use crate::engine::scenario_diff::expand_production;
    use crate::engine::station;
    use chrono::{NaiveDate, NaiveTime};

    fn job(id: &str, allowed: &[&str]) -> Job {
        let mut job = Job {
            route_steps: vec![RouteStep::new("拣料", 3600, 1)],
            scheduled_date: NaiveDate::from_ymd_opt(2024, 3, 4),
            scheduled_start_time: NaiveTime::from_hms_opt(7, 0, 0),
            allowed_shift_ids: allowed.iter().map(|s| s.to_string()).collect(),
            ..Job::new(id)
        };
        station::recalculate(&mut job).unwrap();
        job
    }

    #[test]
    fn test_cascade_recomputes_dependent_jobs_only() {
        let jobs = expand_production(
            &[job("J-ALL", &[]), job("J-S1", &["S1"]), job("J-S2", &["S2"]), Job::new("J-NONE")],
            &[],
        );
        let shifts = vec![
            Shift::new("S1", "早班", "07:00", "15:00").unwrap().with_active(false),
            Shift::new("S2", "中班", "14:00", "22:00").unwrap(),
        ];

        let result = cascade_shift_change(&CalendarBuilder::default(), &jobs, &shifts, "S1");
        assert!(result.is_clean());
        assert_eq!(result.affected_job_ids, vec!["J-ALL".to_string(), "J-S1".to_string()]);
        assert_eq!(result.calendars.len(), 2);

        // S1 停用后，J-ALL 落到中班
        assert_eq!(
            result.calendars[0].start,
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(14, 0, 0).unwrap()
        );
        // J-S1 仅允许已停用的 S1: 按 24/7 回退
        assert!(result.calendars[1].continuous_fallback);
        // 锚点不变
        assert_eq!(jobs[1].job.scheduled_start_time, NaiveTime::from_hms_opt(7, 0, 0));
    }

    #[test]
    fn test_cascade_collects_failures_without_aborting() {
        use crate::engine::scheduler::SchedulerConfig;

        let jobs = expand_production(&[job("J-ALL", &[]), job("J-S2", &["S2"])], &[]);
        let shifts = vec![
            Shift::new("S1", "早班", "07:00", "15:00").unwrap().with_active(false),
            Shift::new("S2", "中班", "14:00", "22:00").unwrap().with_active(false),
        ];
        let builder = CalendarBuilder::new(SchedulerConfig {
            allow_continuous_fallback: false,
            ..SchedulerConfig::default()
        });

        let result = cascade_shift_change(&builder, &jobs, &shifts, "S2");
        assert_eq!(result.affected_job_ids.len(), 2);
        assert!(result.calendars.is_empty());
        let failed: Vec<&str> = result.failures.iter().map(|f| f.job_id.as_str()).collect();
        assert_eq!(failed, vec!["J-ALL", "J-S2"]);
    }
}
