// ==========================================
// 齐套作业排产系统 - 工位并行时长计算
// ==========================================
// EKD = Σ 工序秒数 (单件)
// EJD = setup + make_ready + ceil(EKD × 数量 / 工位数) + take_down
// 红线: 工位数/数量/工序/三项准备收尾任一变化都必须重算，禁止读旧值
// ==========================================

use crate::domain::job::{Job, RouteStep};
use crate::engine::error::{EngineError, EngineResult};

/// 单件时长: 工艺路线秒数之和
pub fn expected_kit_duration(steps: &[RouteStep]) -> EngineResult<i64> {
    steps
        .iter()
        .try_fold(0i64, |acc, s| acc.checked_add(s.expected_seconds))
        .ok_or_else(|| overflow("expected_kit_duration", i64::MAX))
}

fn overflow(field: &str, value: i64) -> EngineError {
    EngineError::DurationOverflow {
        field: field.to_string(),
        value,
    }
}

/// 作业总时长 (不含延误)
pub fn expected_job_duration(
    kit_duration: i64,
    ordered_quantity: u32,
    station_count: u32,
    setup: i64,
    make_ready: i64,
    take_down: i64,
) -> EngineResult<i64> {
    if station_count == 0 {
        return Err(EngineError::InvalidStationCount(station_count));
    }
    let run = kit_duration
        .checked_mul(i64::from(ordered_quantity))
        .ok_or_else(|| overflow("expected_job_duration", kit_duration))?;
    let stations = i64::from(station_count);
    let parallel_run = run / stations + i64::from(run % stations != 0);
    [make_ready, parallel_run, take_down]
        .into_iter()
        .try_fold(setup, |acc, part| acc.checked_add(part))
        .ok_or_else(|| overflow("expected_job_duration", setup))
}

/// 校验作业的时长输入
pub fn validate_job(job: &Job) -> EngineResult<()> {
    let overheads = [
        ("setup", job.setup),
        ("make_ready", job.make_ready),
        ("take_down", job.take_down),
    ];
    for (field, value) in overheads {
        if value < 0 {
            return Err(EngineError::NegativeDuration {
                field: field.to_string(),
                value,
            });
        }
    }

    if let Some(step) = job.route_steps.iter().find(|s| s.expected_seconds < 0) {
        return Err(EngineError::NegativeDuration {
            field: format!("route_steps[{}].expected_seconds", step.name),
            value: step.expected_seconds,
        });
    }

    if job.station_count == 0 {
        return Err(EngineError::InvalidStationCount(job.station_count));
    }
    Ok(())
}

/// 重算作业派生字段 (原地)
pub fn recalculate(job: &mut Job) -> EngineResult<()> {
    validate_job(job)?;
    let kit = expected_kit_duration(&job.route_steps)?;
    job.expected_kit_duration = kit;
    job.expected_job_duration = expected_job_duration(
        kit,
        job.ordered_quantity,
        job.station_count,
        job.setup,
        job.make_ready,
        job.take_down,
    )?;
    Ok(())
}

/// 返回重算后的副本
pub fn recalculated(job: &Job) -> EngineResult<Job> {
    let mut job = job.clone();
    recalculate(&mut job)?;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job {
            route_steps: vec![
                RouteStep::new("拣料", 30, 1),
                RouteStep::new("配套", 45, 2),
                RouteStep::new("复核", 60, 3),
            ],
            ordered_quantity: 10,
            station_count: 2,
            setup: 600,
            make_ready: 120,
            take_down: 300,
            ..Job::new("J1")
        }
    }

    #[test]
    fn test_reference_job_duration() {
        let job = recalculated(&sample_job()).unwrap();
        assert_eq!(job.expected_kit_duration, 135);
        assert_eq!(job.expected_job_duration, 1695);
    }

    #[test]
    fn test_odd_run_rounds_up() {
        // 135 × 3 / 2 = 202.5 -> 203
        let mut job = sample_job();
        job.ordered_quantity = 3;
        recalculate(&mut job).unwrap();
        assert_eq!(job.expected_job_duration, 600 + 120 + 203 + 300);
    }

    #[test]
    fn test_station_scaling_only_touches_run_term() {
        let overhead = 600 + 120 + 300;
        let mut previous = None;
        for stations in [1u32, 2, 4, 8, 16] {
            let mut job = sample_job();
            job.station_count = stations;
            recalculate(&mut job).unwrap();

            let run = job.expected_job_duration - overhead;
            assert_eq!(run, (1350 + i64::from(stations) - 1) / i64::from(stations));
            if let Some(prev) = previous {
                assert!(job.expected_job_duration <= prev);
                assert!(job.expected_job_duration >= overhead);
            }
            previous = Some(job.expected_job_duration);
        }
    }

    #[test]
    fn test_stale_derived_fields_are_overwritten() {
        let mut job = sample_job();
        job.expected_kit_duration = 9999;
        job.expected_job_duration = 1;
        recalculate(&mut job).unwrap();
        assert_eq!(job.expected_job_duration, 1695);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut job = sample_job();
        job.station_count = 0;
        assert_eq!(recalculate(&mut job), Err(EngineError::InvalidStationCount(0)));

        let mut job = sample_job();
        job.take_down = -5;
        assert!(matches!(
            recalculate(&mut job),
            Err(EngineError::NegativeDuration { value: -5, .. })
        ));
    }

    #[test]
    fn test_overflow_is_error_not_panic() {
        let mut job = sample_job();
        job.route_steps = vec![RouteStep::new("拣料", i64::MAX, 1), RouteStep::new("复核", 1, 2)];
        assert!(matches!(
            recalculate(&mut job),
            Err(EngineError::DurationOverflow { .. })
        ));

        let mut job = sample_job();
        job.route_steps = vec![RouteStep::new("拣料", i64::MAX / 2, 1)];
        job.ordered_quantity = 3;
        assert!(matches!(
            recalculate(&mut job),
            Err(EngineError::DurationOverflow { .. })
        ));

        let mut job = sample_job();
        job.setup = i64::MAX;
        assert!(matches!(
            recalculate(&mut job),
            Err(EngineError::DurationOverflow { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_is_overhead_only() {
        let mut job = sample_job();
        job.ordered_quantity = 0;
        recalculate(&mut job).unwrap();
        assert_eq!(job.expected_job_duration, 1020);
    }
}
