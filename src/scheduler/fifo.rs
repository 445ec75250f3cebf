use super::{KernelCtx, SchedParams, Scheduler, TaskId};
use crate::core::Ticks;

/// Plain round-robin: one FIFO, fixed quantum, no I/O.
pub struct RoundRobinScheduler {
    quantum: Ticks,
}

impl Scheduler for RoundRobinScheduler {
    fn init(_ctx: &mut KernelCtx, params: &SchedParams) -> Self {
        Self {
            quantum: params.quantum,
        }
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId) {
        let dsq = ctx.global_dsq();
        ctx.dsq_push_fifo(dsq, task, self.quantum);
    }

    // The core drains the global DSQ before asking us.
    fn dispatch(&mut self, _ctx: &mut KernelCtx) {}

    fn tracks_io(&self) -> bool {
        false
    }
}
