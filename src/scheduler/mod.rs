pub mod fifo;
pub mod priq;

use crate::{
    config::PriorityOrder,
    core::{
        Ticks,
        state::{KernelCtx, TaskId},
    },
};
pub use fifo::RoundRobinScheduler;
pub use priq::{PriorityRrScheduler, PriorityScheduler};

pub const DEFAULT_QUANTUM: Ticks = 100;
pub const TICK_SLICE: Ticks = 1;

/// Policy parameters handed to `Scheduler::init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedParams {
    pub quantum: Ticks,
    pub order: PriorityOrder,
}

impl Default for SchedParams {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            order: PriorityOrder::default(),
        }
    }
}

/// What happens to a running process whose slice ran out with CPU time and
/// no pending I/O trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceExpiry {
    /// Keep the CPU and receive another slice on the next iteration.
    Continue,
    /// Go back to READY through `enqueue`.
    Requeue,
}

pub trait Scheduler {
    fn init(ctx: &mut KernelCtx, params: &SchedParams) -> Self;

    fn name(&self) -> &'static str;

    /// Place a READY process on a dispatch queue, giving it a slice. Called
    /// on admission, on I/O completion and on slice expiry alike.
    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId);

    /// Move the next process to run onto the local DSQ. Called only when the
    /// CPU is idle and both the local and global DSQs are empty.
    fn dispatch(&mut self, ctx: &mut KernelCtx);

    fn on_slice_expiry(&self) -> SliceExpiry {
        SliceExpiry::Requeue
    }

    /// Whether I/O profiles are honoured. When false the core never sends a
    /// process to WAITING.
    fn tracks_io(&self) -> bool {
        true
    }
}
