use serde::{Deserialize, Serialize};

use crate::core::state::{Pid, Ticks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IoProfile {
    /// CPU time consumed between I/O triggers. 0 means no I/O.
    pub period: Ticks,
    /// Wall time one I/O operation takes.
    pub duration: Ticks,
}

impl IoProfile {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn every(period: Ticks, duration: Ticks) -> Self {
        Self { period, duration }
    }

    pub fn performs_io(&self) -> bool {
        self.period > 0
    }
}

/// Process descriptor as handed to the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub pid: Pid,
    pub arrival_time: Ticks,
    pub burst: Ticks,
    pub io: IoProfile,
    pub priority: Option<u32>,
    pub mem_size: u32,
}

impl Job {
    /// CPU-only job with no priority and the smallest memory footprint.
    pub fn new(pid: Pid, arrival_time: Ticks, burst: Ticks) -> Self {
        Self {
            pid,
            arrival_time,
            burst,
            io: IoProfile::none(),
            priority: None,
            mem_size: 1,
        }
    }

    pub fn with_io(mut self, period: Ticks, duration: Ticks) -> Self {
        self.io = IoProfile::every(period, duration);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_mem(mut self, mem_size: u32) -> Self {
        self.mem_size = mem_size;
        self
    }
}
