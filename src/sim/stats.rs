use average::{Estimate, Mean};

use super::trace::Trace;
use crate::core::{KernelCtx, Pid, ProcState, Ticks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStats {
    pub pid: Pid,
    pub arrival_time: Ticks,
    pub burst: Ticks,
    pub admitted_at: Ticks,
    pub start_time: Ticks,
    pub completion_time: Ticks,
    pub ready_time: Ticks,
    pub io_time: Ticks,
}

impl ProcessStats {
    pub fn turnaround(&self) -> Ticks {
        self.completion_time - self.arrival_time
    }

    /// Time to first run.
    pub fn response(&self) -> Ticks {
        self.start_time - self.arrival_time
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub processes: Vec<ProcessStats>,
    pub makespan: Ticks,
    pub mean_turnaround: f64,
    pub mean_response: f64,
    pub mean_ready_wait: f64,
    pub preemptions: usize,
}

impl Summary {
    /// Per-process figures for every terminated process, in input order.
    pub fn collect(ctx: &KernelCtx, trace: &Trace) -> Self {
        let processes: Vec<ProcessStats> = ctx
            .tasks
            .iter()
            .filter(|t| t.state == ProcState::Terminated)
            .map(|t| {
                let (admitted_at, ready_time, io_time) = time_in_states(trace, t.pid);
                ProcessStats {
                    pid: t.pid,
                    arrival_time: t.arrival_time,
                    burst: t.burst,
                    admitted_at,
                    start_time: t.start_time.unwrap_or(admitted_at),
                    completion_time: t.completion_time.unwrap_or(ctx.now),
                    ready_time,
                    io_time,
                }
            })
            .collect();

        Self {
            makespan: ctx.now,
            mean_turnaround: avg(processes.iter().map(|p| p.turnaround() as f64)),
            mean_response: avg(processes.iter().map(|p| p.response() as f64)),
            mean_ready_wait: avg(processes.iter().map(|p| p.ready_time as f64)),
            preemptions: trace.preemption_count(),
            processes,
        }
    }
}

// (admission time, time spent READY, time spent WAITING)
fn time_in_states(trace: &Trace, pid: Pid) -> (Ticks, Ticks, Ticks) {
    let mut admitted_at = 0;
    let mut ready = 0;
    let mut waiting = 0;
    let mut entered: Option<(ProcState, Ticks)> = None;

    for record in trace.for_pid(pid) {
        if record.from == ProcState::New {
            admitted_at = record.time;
        }
        if let Some((state, since)) = entered {
            match state {
                ProcState::Ready => ready += record.time - since,
                ProcState::Waiting => waiting += record.time - since,
                _ => {}
            }
        }
        entered = Some((record.to, record.time));
    }
    (admitted_at, ready, waiting)
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<Mean>().estimate()
}
