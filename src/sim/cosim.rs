//! Co-Simulation 主算法
//!
//! 以输出间隔为网格推进通信点；不接受可变步长的模型在最后一个完整网格点停下。
//! DoStep 返回 Discard 时查询模型是否主动结束；返回 Pending 时轮询直到完成或超时。

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::numeric::DEFAULT_EPSILON;
use super::options::ResolvedOptions;
use super::recorder::{Recorder, Row};
use crate::error::{FmuError, Result};
use crate::fmi2::{ModelInstance, Status, StatusKind, StepOutcome};

/// 挂起步的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 仿真结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// 到达停止时间
    Completed,
    /// 墙钟超时
    Timeout,
    /// 固定步长模型无法精确到达停止时间
    FixedStepBoundary,
    /// 模型通过 Discard + terminated 状态主动结束
    Terminated,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Completed => "completed",
            StopReason::Timeout => "timeout",
            StopReason::FixedStepBoundary => "fixed_step_boundary",
            StopReason::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// 一次仿真的结果
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub final_time: f64,
    /// 成功完成的 DoStep 次数
    pub steps: u64,
    pub stop_reason: StopReason,
}

/// 主循环结束时的位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopEnd {
    pub time: f64,
    pub steps: u64,
    pub reason: StopReason,
}

/// 墙钟计时
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Option<Duration>,
}

impl Deadline {
    pub fn new(timeout: Option<Duration>) -> Deadline {
        Deadline {
            started: Instant::now(),
            timeout,
        }
    }

    pub fn expired(&self) -> bool {
        self.timeout
            .is_some_and(|timeout| self.started.elapsed() > timeout)
    }
}

/// 从 `opts.start_time` 推进到 `opts.stop_time`，每个成功的通信步之后采样
pub fn step_until_stop(
    instance: &mut ModelInstance,
    opts: &ResolvedOptions,
    recorder: &mut Recorder,
    deadline: &Deadline,
) -> Result<LoopEnd> {
    let mut time = opts.start_time;
    let mut grid_index: u64 = 0;
    let mut steps: u64 = 0;

    let reason = loop {
        if deadline.expired() {
            info!(time, "⏱️  仿真超时");
            break StopReason::Timeout;
        }

        if time >= opts.stop_time {
            break StopReason::Completed;
        }

        let next_regular = opts.start_time + (grid_index + 1) as f64 * opts.output_interval;
        let mut next = next_regular;

        if on_grid(next, opts.stop_time, opts.output_interval) {
            // 累加误差不能在末尾留下一个极短的额外步
            next = opts.stop_time;
        } else if next > opts.stop_time {
            if opts.variable_step_size {
                next = opts.stop_time;
            } else {
                debug!(time, next, "固定步长无法精确到达停止时间");
                break StopReason::FixedStepBoundary;
            }
        }

        let step_size = next - time;
        let mut outcome = instance.do_step(time, step_size, false)?;

        if outcome == StepOutcome::Pending {
            match wait_for_step(instance, deadline)? {
                Some(finished) => outcome = finished,
                None => {
                    warn!(time, "挂起步超时，取消当前步");
                    instance.cancel_step()?;
                    break StopReason::Timeout;
                }
            }
        }

        if outcome == StepOutcome::Discarded {
            if instance.get_boolean_status(StatusKind::Terminated)? {
                time = instance.get_real_status(StatusKind::LastSuccessfulTime)?;
                recorder.sample(instance, time, true)?;
                info!(time, "模型请求结束仿真");
                break StopReason::Terminated;
            }
            return Err(FmuError::NativeStatus {
                operation: "fmi2DoStep",
                status: Status::Discard,
            });
        }

        time = next;
        steps += 1;
        recorder.sample(instance, time, false)?;

        if on_grid(time, next_regular, opts.output_interval) {
            grid_index += 1;
        }
    };

    Ok(LoopEnd {
        time,
        steps,
        reason,
    })
}

/// 两个通信点是否落在同一网格点上：容差按输出间隔取，与时间的绝对大小无关
fn on_grid(a: f64, b: f64, interval: f64) -> bool {
    (a - b).abs() <= interval * DEFAULT_EPSILON
}

/// 轮询挂起的 DoStep；超时返回 None
fn wait_for_step(instance: &mut ModelInstance, deadline: &Deadline) -> Result<Option<StepOutcome>> {
    loop {
        if deadline.expired() {
            return Ok(None);
        }
        match instance.poll_pending_step()? {
            StepOutcome::Pending => thread::sleep(POLL_INTERVAL),
            finished => return Ok(Some(finished)),
        }
    }
}
