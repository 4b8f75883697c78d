// ==========================================
// 齐套作业排产系统 - 日片段拆分
// ==========================================
// 输入: 正向排产结果 (实际消耗的工作区间)
// 输出: 每个有工作的日历日一个展示片段
// 规则:
// - 当日工作延续到午夜 (跨夜班次) 时，显示截止为 day_end_cap (默认 23:59)，
//   午夜之后的部分归次日片段
// - 最后一天显示真实完工时刻
// - 片段不可单独移动: ID 编码 作业ID + 日序号，拖动映射回整个作业
// ==========================================

use crate::domain::calendar::{segment_id, DaySegment};
use crate::engine::scheduler::{split_at_midnight, ForwardSchedule, SchedulerConfig};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

/// 单日聚合
struct DayWork {
    first_start: NaiveDateTime,
    last_end: NaiveDateTime,
    seconds: i64,
}

// ==========================================
// DaySegmenter - 日片段拆分器
// ==========================================
#[derive(Debug, Clone)]
pub struct DaySegmenter {
    day_end_cap: NaiveTime,
}

impl DaySegmenter {
    pub fn new(day_end_cap: NaiveTime) -> Self {
        Self { day_end_cap }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.day_end_cap)
    }

    /// 拆分作业跨度为按日片段
    pub fn segment(&self, job_id: &str, schedule: &ForwardSchedule) -> Vec<DaySegment> {
        if schedule.intervals.is_empty() {
            // 零时长作业: 起止同一时刻
            return vec![DaySegment {
                segment_id: segment_id(job_id, 0),
                job_id: job_id.to_string(),
                day_index: 0,
                date: schedule.start.date(),
                display_start: schedule.start.time(),
                display_end: schedule.end.time(),
                is_first_day: true,
                is_last_day: true,
                productive_seconds: 0,
            }];
        }

        let mut days: BTreeMap<NaiveDate, DayWork> = BTreeMap::new();
        for interval in &schedule.intervals {
            for (piece_start, piece_end) in split_at_midnight(interval.start, interval.end) {
                let seconds = (piece_end - piece_start).num_seconds();
                days.entry(piece_start.date())
                    .and_modify(|d| {
                        d.first_start = d.first_start.min(piece_start);
                        d.last_end = d.last_end.max(piece_end);
                        d.seconds += seconds;
                    })
                    .or_insert(DayWork {
                        first_start: piece_start,
                        last_end: piece_end,
                        seconds,
                    });
            }
        }

        let last_index = days.len().saturating_sub(1);
        days.into_iter()
            .enumerate()
            .map(|(index, (date, work))| {
                let next_midnight = crate::engine::scheduler::floor_to_midnight(work.first_start)
                    + Duration::days(1);
                let display_end = if work.last_end >= next_midnight {
                    self.day_end_cap
                } else {
                    work.last_end.time()
                };
                let day_index = index as u32;

                DaySegment {
                    segment_id: segment_id(job_id, day_index),
                    job_id: job_id.to_string(),
                    day_index,
                    date,
                    display_start: work.first_start.time(),
                    display_end,
                    is_first_day: index == 0,
                    is_last_day: index == last_index,
                    productive_seconds: work.seconds,
                }
            })
            .collect()
    }
}

impl Default for DaySegmenter {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::parse_segment_id;
    use crate::domain::shift::{parse_hhmm, Shift};
    use crate::engine::scheduler::ForwardScheduler;
    use crate::engine::shift_calendar::ScheduleOptions;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn schedule(start: NaiveDateTime, seconds: i64, shifts: &[Shift]) -> ForwardSchedule {
        ForwardScheduler::default()
            .schedule_forward(start, seconds, shifts, &ScheduleOptions::default())
            .unwrap()
    }

    #[test]
    fn test_overnight_first_day_capped_at_2359() {
        let night = Shift::new("S3", "夜班", "23:00", "07:00")
            .unwrap()
            .with_break("03:00", 30)
            .unwrap();
        let result = schedule(at(4, 23, 0), 27_000, &[night]);
        let segments = DaySegmenter::default().segment("J1", &result);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].date, at(4, 0, 0).date());
        assert_eq!(segments[0].display_start, parse_hhmm("23:00").unwrap());
        assert_eq!(segments[0].display_end, parse_hhmm("23:59").unwrap());
        assert!(segments[0].is_first_day && !segments[0].is_last_day);

        assert_eq!(segments[1].date, at(5, 0, 0).date());
        assert_eq!(segments[1].display_start, parse_hhmm("00:00").unwrap());
        assert_eq!(segments[1].display_end, parse_hhmm("07:00").unwrap());
        assert!(segments[1].is_last_day);
        assert_eq!(segments[0].productive_seconds + segments[1].productive_seconds, 27_000);
    }

    #[test]
    fn test_intermediate_day_shows_full_shift() {
        let day = Shift::new("S1", "早班", "07:00", "15:00").unwrap();
        // 周一 13:00 起 12 小时: 周一 2h, 周二 8h, 周三 2h
        let result = schedule(at(4, 13, 0), 12 * 3600, &[day]);
        let segments = DaySegmenter::default().segment("J1", &result);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].display_start, parse_hhmm("13:00").unwrap());
        assert_eq!(segments[1].display_start, parse_hhmm("07:00").unwrap());
        assert_eq!(segments[1].display_end, parse_hhmm("15:00").unwrap());
        assert!(!segments[1].is_first_day && !segments[1].is_last_day);
        assert_eq!(segments[2].display_end, parse_hhmm("09:00").unwrap());
    }

    #[test]
    fn test_weekend_days_without_work_are_not_rendered() {
        let day = Shift::new("S1", "早班", "07:00", "15:00").unwrap();
        let result = schedule(at(8, 14, 0), 7200, &[day]);
        let segments = DaySegmenter::default().segment("J9", &result);

        let dates: Vec<NaiveDate> = segments.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![at(8, 0, 0).date(), at(11, 0, 0).date()]);
        assert_eq!(segments[1].day_index, 1);
        assert_eq!(
            parse_segment_id(&segments[1].segment_id),
            Some(("J9".to_string(), 1))
        );
    }

    #[test]
    fn test_zero_duration_single_segment() {
        let day = Shift::new("S1", "早班", "07:00", "15:00").unwrap();
        let result = schedule(at(4, 5, 0), 0, &[day]);
        let segments = DaySegmenter::default().segment("J0", &result);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_first_day && segments[0].is_last_day);
        assert_eq!(segments[0].display_start, parse_hhmm("07:00").unwrap());
    }

    #[test]
    fn test_continuous_fallback_split_per_day() {
        let result = schedule(at(4, 20, 0), 30 * 3600, &[]);
        let segments = DaySegmenter::default().segment("J2", &result);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].display_end, parse_hhmm("23:59").unwrap());
        assert_eq!(segments[1].display_start, parse_hhmm("00:00").unwrap());
        assert_eq!(segments[1].display_end, parse_hhmm("23:59").unwrap());
        assert_eq!(segments[2].display_end, parse_hhmm("02:00").unwrap());
    }
}
