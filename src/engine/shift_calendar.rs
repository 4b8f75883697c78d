// ==========================================
// 齐套作业排产系统 - 班次日历查询
// ==========================================
// 职责: 有效工时计算、时刻所属班次、周末判断、有效班次集合解析
// 纯函数，无状态
// ==========================================

use crate::domain::shift::Shift;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

// ==========================================
// 排产选项
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    pub allowed_shift_ids: Vec<String>, // 空 = 所有启用班次
    pub include_weekends: bool,
    pub ignore_active_status: bool,     // 仅对白名单内班次生效
}

impl ScheduleOptions {
    pub fn for_job(job: &crate::domain::job::Job) -> Self {
        Self {
            allowed_shift_ids: job.allowed_shift_ids.clone(),
            include_weekends: job.include_weekends,
            ignore_active_status: false,
        }
    }
}

/// 班次有效工时（小时）: (wrap(end) - start - break) / 60
pub fn productive_hours(shift: &Shift) -> f64 {
    shift.productive_hours()
}

/// 按迭代顺序返回第一个包含该时刻（且不在休息中）的班次
pub fn shift_containing<'a>(instant: NaiveDateTime, shifts: &'a [Shift]) -> Option<&'a Shift> {
    let time = instant.time();
    shifts.iter().find(|s| s.contains_time(time))
}

/// 周六/周日
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 解析有效班次集合，按 order (其次开始时刻) 排序
///
/// - 白名单非空: 仅白名单内班次；除非 ignore_active_status，否则还需启用
/// - 白名单为空: 所有启用班次
pub fn resolve_effective_shifts(shifts: &[Shift], options: &ScheduleOptions) -> Vec<Shift> {
    let mut effective: Vec<Shift> = if options.allowed_shift_ids.is_empty() {
        shifts.iter().filter(|s| s.is_active).cloned().collect()
    } else {
        shifts
            .iter()
            .filter(|s| options.allowed_shift_ids.iter().any(|id| id == &s.id))
            .filter(|s| options.ignore_active_status || s.is_active)
            .cloned()
            .collect()
    };
    effective.sort_by(|a, b| a.order.cmp(&b.order).then(a.start_time.cmp(&b.start_time)));
    effective
}

/// 校验班次配置: 有效工时必须 > 0，休息必须完整落在班次内
pub fn validate_shift(shift: &Shift) -> EngineResult<()> {
    if shift.id.trim().is_empty() {
        return Err(EngineError::InvalidShift {
            shift_id: shift.id.clone(),
            reason: "班次ID不能为空".to_string(),
        });
    }

    if shift.break_start.is_some() != shift.break_duration_min.is_some() {
        return Err(EngineError::InvalidShift {
            shift_id: shift.id.clone(),
            reason: "休息开始时间与休息时长必须同时设置".to_string(),
        });
    }

    if shift.break_seconds() > 0 {
        let fits = shift
            .break_window()
            .map(|(offset, _)| offset + shift.break_seconds() <= shift.span_seconds())
            .unwrap_or(false);
        if !fits {
            return Err(EngineError::InvalidShift {
                shift_id: shift.id.clone(),
                reason: "休息窗口必须完整落在班次跨度内".to_string(),
            });
        }
    }

    if shift.productive_seconds() <= 0 {
        return Err(EngineError::InvalidShift {
            shift_id: shift.id.clone(),
            reason: "有效工时必须大于 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifts() -> Vec<Shift> {
        vec![
            Shift::new("S2", "中班", "14:00", "22:00").unwrap().with_order(2),
            Shift::new("S1", "早班", "07:00", "15:00")
                .unwrap()
                .with_break("11:00", 30)
                .unwrap()
                .with_order(1),
            Shift::new("S3", "夜班", "23:00", "07:00")
                .unwrap()
                .with_order(3)
                .with_active(false),
        ]
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_resolve_all_active_sorted_by_order() {
        let effective = resolve_effective_shifts(&shifts(), &ScheduleOptions::default());
        let ids: Vec<&str> = effective.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_resolve_allowed_subset_respects_active_flag() {
        let mut options = ScheduleOptions {
            allowed_shift_ids: vec!["S3".to_string(), "S2".to_string()],
            ..ScheduleOptions::default()
        };
        let effective = resolve_effective_shifts(&shifts(), &options);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].id, "S2");

        options.ignore_active_status = true;
        let effective = resolve_effective_shifts(&shifts(), &options);
        let ids: Vec<&str> = effective.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S2", "S3"]);
    }

    #[test]
    fn test_shift_containing_uses_iteration_order() {
        let effective = resolve_effective_shifts(&shifts(), &ScheduleOptions::default());
        // 14:30 同时落在早班与中班内，取迭代顺序第一个
        assert_eq!(shift_containing(at(14, 30), &effective).map(|s| s.id.as_str()), Some("S1"));
        // 休息时间不属于早班
        assert_eq!(shift_containing(at(11, 10), &effective), None);
        assert_eq!(shift_containing(at(6, 0), &effective), None);
    }

    #[test]
    fn test_is_weekend() {
        assert!(is_weekend(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
        assert!(is_weekend(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()));
        assert!(!is_weekend(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()));
    }

    #[test]
    fn test_validate_shift_rejects_break_outside_span() {
        let bad = Shift::new("S1", "早班", "07:00", "15:00")
            .unwrap()
            .with_break("14:45", 30)
            .unwrap();
        assert!(matches!(validate_shift(&bad), Err(EngineError::InvalidShift { .. })));

        let good = Shift::new("S1", "早班", "07:00", "15:00")
            .unwrap()
            .with_break("11:00", 30)
            .unwrap();
        assert!(validate_shift(&good).is_ok());
    }

    #[test]
    fn test_productive_hours_overnight() {
        let night = Shift::new("S3", "夜班", "22:00", "06:00")
            .unwrap()
            .with_break("02:00", 60)
            .unwrap();
        assert!((productive_hours(&night) - 7.0).abs() < f64::EPSILON);
    }
}
