// ==========================================
// 齐套作业排产系统 - 班次感知正向排产引擎
// ==========================================
// 输入: 起始时刻 + 所需工作秒数 + 班次集合 + 作业约束
// 输出: 完工时刻 + 实际消耗的工作区间
// ==========================================
// 算法: 确定性正向模拟 (无搜索/回溯)
// 1) 解析有效班次集合；为空则按 24/7 直接相加 (显式降级)
// 2) 推进到下一个可工作时刻 (跳过周末/休息/班次间隙)
// 3) 在当前不中断子窗口内消耗 min(剩余, 窗口)；不够则整段消耗后重复 2)
// 红线: 剩余恰好等于窗口时停在窗口末尾，不得越过休息/下一班
// ==========================================

use crate::domain::shift::{hhmm, Shift};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::shift_calendar::{is_weekend, resolve_effective_shifts, ScheduleOptions};
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 单个作业可排产的最大时长 (十年连续时间)
pub const MAX_SCHEDULE_SECONDS: i64 = 10 * 366 * 86_400;

// ==========================================
// SchedulerConfig - 排产引擎配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 有效班次为空时是否按 24/7 计算
    pub allow_continuous_fallback: bool,
    /// 查找下一个工作窗口的最大天数
    pub lookahead_days: u32,
    /// 跨夜日片段的显示截止时刻
    #[serde(with = "hhmm")]
    pub day_end_cap: NaiveTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            allow_continuous_fallback: true,
            lookahead_days: 14,
            day_end_cap: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default(),
        }
    }
}

// ==========================================
// 排产结果
// ==========================================

/// 一段实际消耗的工作时间 [start, end)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkInterval {
    pub shift_id: Option<String>, // None = 24/7 回退
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WorkInterval {
    pub fn seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardSchedule {
    pub start: NaiveDateTime, // 推进后的实际开工时刻
    pub end: NaiveDateTime,
    pub intervals: Vec<WorkInterval>,
    pub continuous_fallback: bool,
}

impl ForwardSchedule {
    /// 消耗的有效工作秒数总和
    pub fn consumed_seconds(&self) -> i64 {
        self.intervals.iter().map(|i| i.seconds()).sum()
    }
}

/// 一个不中断的可工作子窗口
#[derive(Debug, Clone)]
struct Window<'a> {
    shift: &'a Shift,
    rank: usize,
    from: NaiveDateTime,
    until: NaiveDateTime,
}

/// 截到当日 00:00
pub(crate) fn floor_to_midnight(t: NaiveDateTime) -> NaiveDateTime {
    t - Duration::seconds(i64::from(t.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(t.nanosecond()))
}

/// 按午夜切分区间 (每段落在同一日历日内，末端可等于次日 00:00)
pub(crate) fn split_at_midnight(
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut pieces = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next_midnight = floor_to_midnight(cursor) + Duration::days(1);
        let piece_end = end.min(next_midnight);
        pieces.push((cursor, piece_end));
        cursor = piece_end;
    }
    pieces
}

// ==========================================
// ForwardScheduler - 正向排产引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ForwardScheduler {
    config: SchedulerConfig,
}

impl ForwardScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 正向排产: 从 start 起消耗 duration_seconds 秒有效工作时间
    ///
    /// # 返回
    /// - `ForwardSchedule.start`: 推进到首个可工作时刻后的起点
    /// - `ForwardSchedule.end`: 完工时刻 (零时长作业 = 推进后的起点)
    ///
    /// # 错误
    /// - `NegativeDuration`: 时长为负
    /// - `EmptyShiftSet`: 有效班次为空且禁用 24/7 回退
    /// - `NoProductiveWindow`: 有班次但在查找范围内没有任何工作窗口
    #[instrument(skip(self, shifts, options), fields(
        start = %start,
        duration_seconds = duration_seconds,
        include_weekends = options.include_weekends
    ))]
    pub fn schedule_forward(
        &self,
        start: NaiveDateTime,
        duration_seconds: i64,
        shifts: &[Shift],
        options: &ScheduleOptions,
    ) -> EngineResult<ForwardSchedule> {
        if duration_seconds < 0 {
            return Err(EngineError::NegativeDuration {
                field: "duration_seconds".to_string(),
                value: duration_seconds,
            });
        }
        if duration_seconds > MAX_SCHEDULE_SECONDS {
            return Err(EngineError::DurationOverflow {
                field: "duration_seconds".to_string(),
                value: duration_seconds,
            });
        }

        let effective = resolve_effective_shifts(shifts, options);
        if effective.is_empty() {
            return self.continuous_fallback(start, duration_seconds);
        }

        let first = self.next_window(start, &effective, options.include_weekends)?;
        let effective_start = first.from;
        let mut window = first;
        let mut remaining = duration_seconds;
        let mut intervals: Vec<WorkInterval> = Vec::new();

        let end = loop {
            let window_seconds = (window.until - window.from).num_seconds();
            if remaining <= window_seconds {
                let end = window.from + Duration::seconds(remaining);
                push_interval(&mut intervals, window.shift, window.from, end);
                break end;
            }

            push_interval(&mut intervals, window.shift, window.from, window.until);
            remaining -= window_seconds;
            window = self.next_window(window.until, &effective, options.include_weekends)?;
        };

        tracing::debug!(
            effective_start = %effective_start,
            end = %end,
            intervals = intervals.len(),
            "正向排产完成"
        );

        Ok(ForwardSchedule {
            start: effective_start,
            end,
            intervals,
            continuous_fallback: false,
        })
    }

    /// 统计 [from, to) 之间的有效工作秒数
    ///
    /// 与 schedule_forward 使用同一套窗口规则，用于核对时长守恒与情景对比
    pub fn productive_seconds_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        shifts: &[Shift],
        options: &ScheduleOptions,
    ) -> EngineResult<i64> {
        if to <= from {
            return Ok(0);
        }

        let effective = resolve_effective_shifts(shifts, options);
        if effective.is_empty() {
            if !self.config.allow_continuous_fallback {
                return Err(EngineError::EmptyShiftSet);
            }
            return Ok((to - from).num_seconds());
        }

        let mut cursor = from;
        let mut total = 0;
        while cursor < to {
            let window = match self.next_window(cursor, &effective, options.include_weekends) {
                Ok(w) => w,
                Err(EngineError::NoProductiveWindow { .. }) => break,
                Err(e) => return Err(e),
            };
            if window.from >= to {
                break;
            }
            total += (window.until.min(to) - window.from).num_seconds();
            cursor = window.until;
        }
        Ok(total)
    }

    // ==========================================
    // 内部方法
    // ==========================================

    fn continuous_fallback(
        &self,
        start: NaiveDateTime,
        duration_seconds: i64,
    ) -> EngineResult<ForwardSchedule> {
        if !self.config.allow_continuous_fallback {
            return Err(EngineError::EmptyShiftSet);
        }

        tracing::warn!(start = %start, duration_seconds, "有效班次为空，按 24/7 连续计算");

        let end = start
            .checked_add_signed(Duration::seconds(duration_seconds))
            .ok_or_else(|| EngineError::DurationOverflow {
                field: "duration_seconds".to_string(),
                value: duration_seconds,
            })?;
        let intervals = if duration_seconds > 0 {
            vec![WorkInterval {
                shift_id: None,
                start,
                end,
            }]
        } else {
            Vec::new()
        };

        Ok(ForwardSchedule {
            start,
            end,
            intervals,
            continuous_fallback: true,
        })
    }

    /// 查找结束于 from 之后、最早可开工的子窗口
    ///
    /// 同一开工时刻按班次迭代顺序 (order) 取优先；
    /// 排除周末时，跨夜窗口落在周六/周日的部分被剔除
    fn next_window<'a>(
        &self,
        from: NaiveDateTime,
        shifts: &'a [Shift],
        include_weekends: bool,
    ) -> EngineResult<Window<'a>> {
        // 前一天开班的跨夜实例可能覆盖 from
        let mut day_start = floor_to_midnight(from) - Duration::days(1);
        let horizon = floor_to_midnight(from) + Duration::days(i64::from(self.config.lookahead_days));
        let mut best: Option<Window<'a>> = None;

        while day_start <= horizon {
            let day = day_start.date();
            for (rank, shift) in shifts.iter().enumerate() {
                for (window_start, window_end) in shift.productive_windows_on(day) {
                    for (piece_start, piece_end) in split_at_midnight(window_start, window_end) {
                        if piece_end <= from {
                            continue;
                        }
                        if !include_weekends && is_weekend(piece_start.date()) {
                            continue;
                        }

                        let candidate_from = piece_start.max(from);
                        let better = match &best {
                            None => true,
                            Some(w) => (candidate_from, rank) < (w.from, w.rank),
                        };
                        if better {
                            best = Some(Window {
                                shift,
                                rank,
                                from: candidate_from,
                                until: piece_end,
                            });
                        }
                    }
                }
            }

            // 之后各天的实例都不早于次日 00:00
            let next_day_start = day_start + Duration::days(1);
            if let Some(w) = &best {
                if w.from < next_day_start {
                    break;
                }
            }
            day_start = next_day_start;
        }

        best.ok_or(EngineError::NoProductiveWindow {
            from,
            lookahead_days: self.config.lookahead_days,
        })
    }
}

/// 追加工作区间，与前一段首尾相接且同班次时合并
fn push_interval(
    intervals: &mut Vec<WorkInterval>,
    shift: &Shift,
    start: NaiveDateTime,
    end: NaiveDateTime,
) {
    if end <= start {
        return;
    }
    if let Some(last) = intervals.last_mut() {
        if last.end == start && last.shift_id.as_deref() == Some(shift.id.as_str()) {
            last.end = end;
            return;
        }
    }
    intervals.push(WorkInterval {
        shift_id: Some(shift.id.clone()),
        start,
        end,
    });
}
