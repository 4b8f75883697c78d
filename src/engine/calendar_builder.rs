// ==========================================
// 齐套作业排产系统 - 日历组装
// ==========================================
// 流水线: 叠加作业 (已注入延误) -> 正向排产 -> 日片段拆分 -> JobCalendar
// 未设置排产日期的作业不进入日历
// 情景对比: 同一班次配置下生产视图与情景视图的完工时刻差
//           (含只挂了情景延误的作业)
// ==========================================

use crate::domain::calendar::JobCalendar;
use crate::domain::scenario::OverlayJob;
use crate::domain::shift::Shift;
use crate::domain::types::OverlayStatus;
use crate::engine::day_segment::DaySegmenter;
use crate::engine::error::EngineResult;
use crate::engine::scheduler::{ForwardScheduler, SchedulerConfig};
use crate::engine::shift_calendar::ScheduleOptions;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 单个作业的情景对比结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDelta {
    pub job_id: String,
    pub status: OverlayStatus,
    pub production_end: Option<NaiveDateTime>, // 新增作业为 None
    pub scenario_end: Option<NaiveDateTime>,   // 删除作业为 None
    pub delta_seconds: Option<i64>,            // 日历秒差 (情景 - 生产)
    pub productive_delta_seconds: Option<i64>, // 两个完工时刻之间的有效工作秒差
}

// ==========================================
// CalendarBuilder
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CalendarBuilder {
    scheduler: ForwardScheduler,
    segmenter: DaySegmenter,
}

impl CalendarBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            segmenter: DaySegmenter::from_config(&config),
            scheduler: ForwardScheduler::new(config),
        }
    }

    pub fn scheduler(&self) -> &ForwardScheduler {
        &self.scheduler
    }

    /// 组装单个作业的日历条目 (未排产返回 None)
    pub fn build(&self, overlay: &OverlayJob, shifts: &[Shift]) -> EngineResult<Option<JobCalendar>> {
        let Some(start) = overlay.job.scheduled_start() else {
            return Ok(None);
        };

        let options = ScheduleOptions::for_job(&overlay.job);
        let schedule = self.scheduler.schedule_forward(
            start,
            overlay.job.expected_job_duration,
            shifts,
            &options,
        )?;
        let segments = self.segmenter.segment(&overlay.job.id, &schedule);

        Ok(Some(JobCalendar {
            job_id: overlay.job.id.clone(),
            start: schedule.start,
            end: schedule.end,
            duration_seconds: overlay.job.expected_job_duration,
            continuous_fallback: schedule.continuous_fallback,
            steps: overlay.steps.clone(),
            segments,
            annotation: overlay.annotation.clone(),
        }))
    }

    /// 组装全部已排产作业 (含逻辑删除的幽灵条目)
    pub fn build_all(&self, overlays: &[OverlayJob], shifts: &[Shift]) -> EngineResult<Vec<JobCalendar>> {
        let mut calendars = Vec::with_capacity(overlays.len());
        for overlay in overlays {
            if let Some(calendar) = self.build(overlay, shifts)? {
                calendars.push(calendar);
            }
        }
        Ok(calendars)
    }

    /// 对比生产视图与情景视图，只报告与生产不同的作业
    ///
    /// 判定: 带情景标记，或延误秒数不同，或完工时刻不同
    pub fn compare(
        &self,
        production: &[OverlayJob],
        scenario: &[OverlayJob],
        shifts: &[Shift],
    ) -> EngineResult<Vec<ScheduleDelta>> {
        let mut deltas = Vec::new();

        for overlay in scenario {
            let base = production.iter().find(|p| p.job.id == overlay.job.id);
            let status = match &overlay.annotation {
                Some(annotation) => annotation.status,
                // 无标记且延误一致: 输入相同，完工时刻必然相同
                None if base.map(|b| b.delay_seconds) == Some(overlay.delay_seconds) => continue,
                None => OverlayStatus::Delayed,
            };

            let production_end = match base {
                Some(base) => self.build(base, shifts)?.map(|c| c.end),
                None => None,
            };
            let scenario_end = if overlay.is_deleted() {
                None
            } else {
                self.build(overlay, shifts)?.map(|c| c.end)
            };

            let (delta_seconds, productive_delta_seconds) = match (production_end, scenario_end) {
                (Some(before), Some(after)) => {
                    let options = ScheduleOptions::for_job(&overlay.job);
                    let productive = if after >= before {
                        self.scheduler
                            .productive_seconds_between(before, after, shifts, &options)?
                    } else {
                        -self
                            .scheduler
                            .productive_seconds_between(after, before, shifts, &options)?
                    };
                    (Some((after - before).num_seconds()), Some(productive))
                }
                _ => (None, None),
            };

            deltas.push(ScheduleDelta {
                job_id: overlay.job.id.clone(),
                status,
                production_end,
                scenario_end,
                delta_seconds,
                productive_delta_seconds,
            });
        }
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{Job, RouteStep};
    use crate::domain::scenario::{OverlayAnnotation, Scenario, ScenarioChange};
    use crate::domain::types::ChangeOperation;
    use crate::engine::scenario_diff::{compute_overlay, expand_production};
    use crate::engine::station;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn shifts() -> Vec<Shift> {
        vec![Shift::new("S1", "早班", "07:00", "15:00")
            .unwrap()
            .with_break("11:00", 30)
            .unwrap()]
    }

    fn scheduled_job(id: &str, seconds: i64) -> Job {
        let mut job = Job {
            route_steps: vec![RouteStep::new("拣料", seconds, 1)],
            scheduled_date: NaiveDate::from_ymd_opt(2024, 3, 4),
            scheduled_start_time: chrono::NaiveTime::from_hms_opt(7, 0, 0),
            ..Job::new(id)
        };
        station::recalculate(&mut job).unwrap();
        job
    }

    #[test]
    fn test_build_reference_calendar() {
        let overlays = expand_production(&[scheduled_job("J1", 28_800), Job::new("UNSCHEDULED")], &[]);
        let calendars = CalendarBuilder::default().build_all(&overlays, &shifts()).unwrap();

        assert_eq!(calendars.len(), 1);
        let calendar = &calendars[0];
        assert_eq!(calendar.end, at(5, 7, 30));
        assert_eq!(calendar.segments.len(), 2);
        assert_eq!(calendar.steps.len(), 1);
        assert!(calendar.annotation.is_none());
    }

    #[test]
    fn test_compare_reports_touched_jobs_only() {
        let production = vec![scheduled_job("J1", 3600), scheduled_job("J2", 3600)];
        let scenario = Scenario {
            id: "SC1".to_string(),
            name: "试算".to_string(),
            description: None,
            is_active: true,
            created_at: at(1, 0, 0),
            updated_at: at(1, 0, 0),
        };
        let quantity_patch = match json!({"ordered_quantity": 5}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let changes = vec![
            ScenarioChange {
                id: 1,
                scenario_id: "SC1".to_string(),
                job_id: Some("J1".to_string()),
                operation: ChangeOperation::Modify,
                change_data: quantity_patch,
                original_data: None,
                created_at: at(1, 0, 0),
            },
            ScenarioChange {
                id: 2,
                scenario_id: "SC1".to_string(),
                job_id: Some("J2".to_string()),
                operation: ChangeOperation::Delete,
                change_data: Default::default(),
                original_data: None,
                created_at: at(1, 0, 0),
            },
        ];

        let base = expand_production(&production, &[]);
        let overlay = compute_overlay(&production, &scenario, &changes, &[]);
        let deltas = CalendarBuilder::default()
            .compare(&base, &overlay, &shifts())
            .unwrap();

        assert_eq!(deltas.len(), 2);
        let j1 = &deltas[0];
        assert_eq!(j1.status, OverlayStatus::Modified);
        assert_eq!(j1.production_end, Some(at(4, 8, 0)));
        // 5 小时: 07:00-11:00 + 11:30-12:30
        assert_eq!(j1.scenario_end, Some(at(4, 12, 30)));
        assert_eq!(j1.delta_seconds, Some(4 * 3600 + 1800));
        assert_eq!(j1.productive_delta_seconds, Some(4 * 3600));

        let j2 = &deltas[1];
        assert_eq!(j2.status, OverlayStatus::Deleted);
        assert!(j2.scenario_end.is_none());
        assert!(j2.delta_seconds.is_none());
    }

    #[test]
    fn test_compare_reports_scenario_delay_only_job() {
        use crate::domain::delay::JobDelay;

        let production = vec![scheduled_job("J1", 3600), scheduled_job("J2", 3600)];
        let scenario = Scenario {
            id: "SC1".to_string(),
            name: "试算".to_string(),
            description: None,
            is_active: true,
            created_at: at(1, 0, 0),
            updated_at: at(1, 0, 0),
        };
        let delays = vec![JobDelay {
            id: "D1".to_string(),
            scenario_id: Some("SC1".to_string()),
            job_id: "J1".to_string(),
            name: "停线".to_string(),
            duration: 7200,
            insert_after: 1,
            created_at: at(1, 0, 0),
        }];

        let base = expand_production(&production, &delays);
        let overlay = compute_overlay(&production, &scenario, &[], &delays);
        let deltas = CalendarBuilder::default()
            .compare(&base, &overlay, &shifts())
            .unwrap();

        assert_eq!(deltas.len(), 1);
        let j1 = &deltas[0];
        assert_eq!(j1.job_id, "J1");
        assert_eq!(j1.status, OverlayStatus::Delayed);
        assert_eq!(j1.production_end, Some(at(4, 8, 0)));
        // 3 小时: 07:00-10:00
        assert_eq!(j1.scenario_end, Some(at(4, 10, 0)));
        assert_eq!(j1.productive_delta_seconds, Some(7200));
    }

    #[test]
    fn test_deleted_job_still_rendered_with_annotation() {
        let mut overlays = expand_production(&[scheduled_job("J1", 600)], &[]);
        overlays[0].annotation = Some(OverlayAnnotation {
            scenario_id: "SC1".to_string(),
            scenario_name: "试算".to_string(),
            status: OverlayStatus::Deleted,
            change_id: Some(1),
        });
        let calendars = CalendarBuilder::default().build_all(&overlays, &shifts()).unwrap();
        assert_eq!(calendars.len(), 1);
        assert!(calendars[0].annotation.as_ref().unwrap().is_deleted());
    }
}
