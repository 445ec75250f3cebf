//! procsim - deterministic single-CPU process scheduling simulator.
//!
//! Processes are admitted into fixed memory partitions, scheduled under one
//! of three disciplines (non-preemptive priority, priority with a quantum,
//! round-robin) and optionally interleave CPU bursts with I/O. A run yields
//! an execution trace of every state transition and a log of the partition
//! table after each allocation and free.
//!
//! ```rust,no_run
//! use procsim::{Job, SimConfig, fmt::render_trace, run_simulation};
//!
//! let jobs = vec![Job::new(1, 0, 20).with_io(5, 3), Job::new(2, 2, 10)];
//! let output = run_simulation(jobs, &SimConfig::default()).unwrap();
//! print!("{}", render_trace(&output.trace));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod fmt;
pub mod input;
pub mod memory;
pub mod scheduler;
pub mod sim;
pub mod workload;

pub use crate::core::{Pid, ProcState, SchedCoreEvent, Ticks};
pub use config::{Discipline, PriorityOrder, SimConfig};
pub use error::SimError;
pub use memory::{Partition, PartitionTable};
pub use scheduler::Scheduler;
pub use sim::{Job, RunOutcome, Sim, SimOutput, run_simulation};
