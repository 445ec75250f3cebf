use thiserror::Error;

use crate::{config::ConfigError, core::Pid};

/// Setup failures. A simulation that gets past `Sim::new` always runs to an
/// outcome; a stall is reported through `RunOutcome`, not through here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("pid {pid} exceeds the maximum supported pid {max}")]
    PidOutOfRange { pid: Pid, max: Pid },
    #[error("pid {pid} appears more than once in the input")]
    DuplicatePid { pid: Pid },
    #[error("pid {pid}: arrival, burst and I/O times overflow the simulated clock")]
    TimelineOverflow { pid: Pid },
}
