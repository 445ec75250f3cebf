pub mod driver;
pub mod job;
pub mod stats;
pub mod trace;

pub use driver::{RunOutcome, Sim, SimOutput, Stall};
pub use job::{IoProfile, Job};
pub use stats::{ProcessStats, Summary};
pub use trace::{MemoryLog, MemorySnapshot, Trace, TraceRecord};

use crate::{
    config::{Discipline, SimConfig},
    error::SimError,
    scheduler::{PriorityRrScheduler, PriorityScheduler, RoundRobinScheduler, Scheduler},
};

/// Run `jobs` to completion under `config`.
///
/// Setup problems are returned as errors. Processes that can never be
/// admitted end the run early with `RunOutcome::Stalled`; the trace up to
/// that point is still returned.
pub fn run_simulation(jobs: Vec<Job>, config: &SimConfig) -> Result<SimOutput, SimError> {
    match config.discipline {
        Discipline::Priority => drive::<PriorityScheduler>(jobs, config),
        Discipline::PriorityRr => drive::<PriorityRrScheduler>(jobs, config),
        Discipline::RoundRobin => drive::<RoundRobinScheduler>(jobs, config),
    }
}

fn drive<S: Scheduler>(jobs: Vec<Job>, config: &SimConfig) -> Result<SimOutput, SimError> {
    Ok(Sim::<S>::new(jobs, config)?.into_output())
}
