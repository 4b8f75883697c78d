// ==========================================
// 齐套作业排产系统 - 延误注入
// ==========================================
// 输入: 作业 + 延误列表
// 输出: 插入延误步骤后的执行序列 + 延长后的总时长
// 规则:
// - insert_after = k 的延误插在最后一个 order <= k 的工序之后
//   (k = 0 即第一道工序之前)；超出末道工序的追加在末尾
// - 同一位置的多个延误按创建顺序
// - 插入后全部步骤 order 重新编号为 1..n
// 纯函数: 不修改输入作业，不落库
// ==========================================

use crate::domain::delay::{DelayStep, JobDelay};
use crate::domain::job::{Job, ScheduleStep};
use serde::{Deserialize, Serialize};

/// 注入延误后的作业
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedJob {
    pub job: Job, // expected_job_duration 已含延误
    pub steps: Vec<ScheduleStep>,
    pub delay_seconds: i64,
}

/// 不带延误展开作业
pub fn expand(job: &Job) -> ExpandedJob {
    apply_delays(job, &[])
}

/// 将属于该作业的延误插入工艺路线
pub fn apply_delays(job: &Job, delays: &[JobDelay]) -> ExpandedJob {
    let mut pending: Vec<&JobDelay> = delays.iter().filter(|d| d.job_id == job.id).collect();
    // 稳定排序: 位置优先，其次创建顺序
    pending.sort_by(|a, b| {
        a.insert_after
            .cmp(&b.insert_after)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });

    let route = job.sorted_route_steps();
    let mut steps: Vec<ScheduleStep> = Vec::with_capacity(route.len() + pending.len());
    let mut queue = pending.iter().peekable();

    for step in route {
        while let Some(delay) = queue.next_if(|d| d.insert_after < step.order) {
            steps.push(ScheduleStep::Delay(DelayStep::from(*delay)));
        }
        steps.push(ScheduleStep::Real(step));
    }
    for delay in queue {
        steps.push(ScheduleStep::Delay(DelayStep::from(*delay)));
    }

    for (index, step) in steps.iter_mut().enumerate() {
        step.set_order(index as u32 + 1);
    }

    // 溢出时饱和，交给正向排产的时长上限拒绝
    let delay_seconds = pending
        .iter()
        .fold(0i64, |acc, d| acc.saturating_add(d.duration));
    let mut expanded = job.clone();
    expanded.expected_job_duration = expanded.expected_job_duration.saturating_add(delay_seconds);

    if delay_seconds > 0 {
        tracing::debug!(
            job_id = %job.id,
            delays = pending.len(),
            delay_seconds,
            "延误已注入"
        );
    }

    ExpandedJob {
        job: expanded,
        steps,
        delay_seconds,
    }
}
