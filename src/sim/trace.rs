use crate::{
    core::{Pid, ProcState, Ticks},
    memory::Partition,
};

/// One state transition of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub time: Ticks,
    pub pid: Pid,
    pub from: ProcState,
    pub to: ProcState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    records: Vec<TraceRecord>,
}

impl Trace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn for_pid(&self, pid: Pid) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter().filter(move |r| r.pid == pid)
    }

    /// States visited by `pid`, starting with NEW.
    pub fn states_of(&self, pid: Pid) -> Vec<ProcState> {
        let mut states = Vec::new();
        for record in self.for_pid(pid) {
            if states.is_empty() {
                states.push(record.from);
            }
            states.push(record.to);
        }
        states
    }

    /// Sum of the intervals `pid` spent RUNNING.
    pub fn total_runtime(&self, pid: Pid) -> Ticks {
        let mut total = 0;
        let mut running_since = None;

        for record in self.for_pid(pid) {
            if record.to == ProcState::Running {
                running_since = Some(record.time);
            } else if record.from == ProcState::Running {
                if let Some(start) = running_since.take() {
                    total += record.time - start;
                }
            }
        }
        total
    }

    pub fn dispatch_count(&self, pid: Pid) -> usize {
        self.for_pid(pid)
            .filter(|r| r.to == ProcState::Running)
            .count()
    }

    /// Quantum expiries: RUNNING -> READY transitions across all processes.
    pub fn preemption_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.from == ProcState::Running && r.to == ProcState::Ready)
            .count()
    }

    pub fn completion_time(&self, pid: Pid) -> Option<Ticks> {
        self.for_pid(pid)
            .find(|r| r.to == ProcState::Terminated)
            .map(|r| r.time)
    }

    /// Pids in the order they terminated.
    pub fn completion_order(&self) -> Vec<Pid> {
        self.records
            .iter()
            .filter(|r| r.to == ProcState::Terminated)
            .map(|r| r.pid)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Partition table as it stood right after an allocation or a free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub time: Ticks,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLog {
    snapshots: Vec<MemorySnapshot>,
}

impl MemoryLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, time: Ticks, partitions: Vec<Partition>) {
        self.snapshots.push(MemorySnapshot { time, partitions });
    }

    pub fn snapshots(&self) -> &[MemorySnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
