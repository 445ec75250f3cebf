use crate::core::{Pid, ProcState, Ticks};
use crate::memory::Partition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedCoreEvent {
    TaskStateChange {
        time: Ticks,
        pid: Pid,
        from: ProcState,
        to: ProcState,
    },
    // Emitted after every allocation and every free
    PartitionTableChanged {
        time: Ticks,
        partitions: Vec<Partition>,
    },
    // Nothing to dispatch this iteration
    CpuIdle {
        time: Ticks,
    },
}
