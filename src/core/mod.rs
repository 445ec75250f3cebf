pub mod driver;
pub mod event;
pub mod observer;
pub mod state;

pub use driver::{CpuStep, SchedCore, SliceOutcome};
pub use event::SchedCoreEvent;
pub use state::{
    Dsq, DsqId, IoTracker, KernelCtx, Pid, ProcState, Process, Rank, TaskId, Ticks, WaitEntry,
};
