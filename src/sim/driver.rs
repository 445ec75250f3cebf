use super::{
    job::Job,
    stats::Summary,
    trace::{MemoryLog, Trace, TraceRecord},
};
use crate::{
    config::SimConfig,
    core::{
        CpuStep, SchedCoreEvent, SliceOutcome,
        driver::SchedCore,
        state::{Pid, TaskId, Ticks},
    },
    error::SimError,
    memory::PartitionTable,
    scheduler::{SchedParams, Scheduler},
};
use rustc_hash::FxHashSet;
use tracing::{debug, info, trace, warn};

/// Processes that can never leave NEW: they have arrived, nothing else is
/// left to run, and no partition fits them even with the whole table free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stall {
    pub time: Ticks,
    pub pids: Vec<Pid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stalled(Stall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimOutput {
    pub trace: Trace,
    pub memory_log: MemoryLog,
    pub summary: Summary,
    pub outcome: RunOutcome,
}

pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
    memory: PartitionTable,
    // Not yet admitted, ordered by arrival (input order on ties)
    pending: Vec<TaskId>,
    trace: Trace,
    memory_log: MemoryLog,
    outcome: Option<RunOutcome>,
}

impl<S: Scheduler> Sim<S> {
    pub fn new(jobs: Vec<Job>, config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Self::with_memory(
            jobs,
            config.partition_table()?,
            &config.sched_params(),
            config.max_pid,
        )
    }

    /// Build a simulation around an explicit partition table.
    pub fn with_memory(
        mut jobs: Vec<Job>,
        memory: PartitionTable,
        params: &SchedParams,
        max_pid: Option<Pid>,
    ) -> Result<Self, SimError> {
        if params.quantum == 0 {
            return Err(crate::config::ConfigError::ZeroQuantum.into());
        }

        let mut seen = FxHashSet::default();
        for job in &jobs {
            if let Some(max) = max_pid {
                if job.pid > max {
                    return Err(SimError::PidOutOfRange { pid: job.pid, max });
                }
            }
            if !seen.insert(job.pid) {
                return Err(SimError::DuplicatePid { pid: job.pid });
            }
        }

        // Stable: equal arrivals keep input order
        jobs.sort_by_key(|job| job.arrival_time);

        let mut core = SchedCore::<S>::new(params);
        let tracks_io = core.scheduler.tracks_io();
        check_horizon(&jobs, tracks_io)?;
        let mut ignored_io = 0;
        let pending: Vec<TaskId> = jobs
            .iter()
            .map(|job| {
                if !memory.can_ever_fit(job.mem_size) {
                    warn!(
                        pid = job.pid,
                        size = job.mem_size,
                        largest = memory.largest(),
                        "process does not fit any partition"
                    );
                }
                if !tracks_io && job.io.performs_io() {
                    ignored_io += 1;
                }
                core.ctx.create_task(job)
            })
            .collect();

        if ignored_io > 0 {
            warn!(
                scheduler = core.scheduler.name(),
                processes = ignored_io,
                "I/O profiles ignored by this discipline"
            );
        }

        Ok(Self {
            core,
            memory,
            pending,
            trace: Trace::new(),
            memory_log: MemoryLog::new(),
            outcome: None,
        })
    }

    /// One loop iteration: admission, I/O completion, one CPU step.
    pub fn step(&mut self) -> Vec<SchedCoreEvent> {
        self.handle_arrivals();
        self.core.wake_due_waiters();

        let step = self.core.run_cpu();
        if let CpuStep::Ran {
            task,
            outcome: SliceOutcome::Terminated,
            ..
        } = step
        {
            self.release_memory(task);
        }

        self.core.observe(&self.memory);

        let events = self.core.ctx.drain_events();
        self.record(&events);
        events
    }

    /// Step until every process has terminated or admission has stalled.
    pub fn run(&mut self) -> RunOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        info!(
            scheduler = self.core.scheduler.name(),
            processes = self.core.ctx.tasks.len(),
            "simulation start"
        );

        let outcome = loop {
            if self.all_jobs_completed() {
                break RunOutcome::Completed;
            }
            if let Some(stall) = self.detect_stall() {
                warn!(time = stall.time, pids = ?stall.pids, "admission stalled");
                break RunOutcome::Stalled(stall);
            }
            self.step();
        };

        info!(
            time = self.core.now(),
            transitions = self.trace.len(),
            snapshots = self.memory_log.len(),
            "simulation finished"
        );
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn handle_arrivals(&mut self) {
        let now = self.core.now();
        let pending = std::mem::take(&mut self.pending);
        let mut still_pending = Vec::with_capacity(pending.len());

        for task in pending {
            if self.core.ctx.task(task).arrival_time > now || !self.try_admit(task) {
                still_pending.push(task);
            }
        }
        self.pending = still_pending;
    }

    fn try_admit(&mut self, task: TaskId) -> bool {
        let (pid, size) = {
            let t = self.core.ctx.task(task);
            (t.pid, t.mem_size)
        };

        match self.memory.allocate(pid, size) {
            Some(partition) => {
                debug!(pid, partition, size, "partition allocated");
                self.core.admit_task(task);
                self.snapshot_memory();
                true
            }
            None => {
                trace!(pid, size, "no free partition fits");
                false
            }
        }
    }

    fn release_memory(&mut self, task: TaskId) {
        let pid = self.core.ctx.task(task).pid;
        let freed = self.memory.free(pid);
        debug_assert!(freed.is_some(), "pid {pid} terminated without a partition");
        debug!(pid, partition = ?freed, "partition freed");
        self.snapshot_memory();
    }

    fn snapshot_memory(&mut self) {
        let now = self.core.now();
        let partitions = self.memory.snapshot();
        self.core
            .ctx
            .emit(SchedCoreEvent::PartitionTableChanged { time: now, partitions });
    }

    fn record(&mut self, events: &[SchedCoreEvent]) {
        for event in events {
            match event {
                SchedCoreEvent::TaskStateChange { time, pid, from, to } => {
                    self.trace.record(TraceRecord {
                        time: *time,
                        pid: *pid,
                        from: *from,
                        to: *to,
                    });
                }
                SchedCoreEvent::PartitionTableChanged { time, partitions } => {
                    self.memory_log.record(*time, partitions.clone());
                }
                SchedCoreEvent::CpuIdle { .. } => {}
            }
        }
    }

    // Nothing active means every partition is free, so a pending process
    // that does not fit now never will.
    fn detect_stall(&self) -> Option<Stall> {
        if self.pending.is_empty() || self.core.ctx.active_count() > 0 {
            return None;
        }

        let now = self.core.now();
        let mut pids = Vec::with_capacity(self.pending.len());
        for &task in &self.pending {
            let t = self.core.ctx.task(task);
            if t.arrival_time > now || self.memory.can_ever_fit(t.mem_size) {
                return None;
            }
            pids.push(t.pid);
        }
        Some(Stall { time: now, pids })
    }

    pub fn all_jobs_completed(&self) -> bool {
        self.core.ctx.all_terminated()
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn memory_log(&self) -> &MemoryLog {
        &self.memory_log
    }

    pub fn summary(&self) -> Summary {
        Summary::collect(&self.core.ctx, &self.trace)
    }

    /// Run to an outcome (if not already done) and hand back the results.
    pub fn into_output(mut self) -> SimOutput {
        let outcome = self.run();
        let summary = self.summary();
        SimOutput {
            trace: self.trace,
            memory_log: self.memory_log,
            summary,
            outcome,
        }
    }
}

// Latest arrival plus every tick of CPU and I/O is an upper bound on the
// clock, so if it fits in `Ticks` no clock arithmetic can overflow.
fn check_horizon(jobs: &[Job], tracks_io: bool) -> Result<(), SimError> {
    let mut horizon = jobs.iter().map(|job| job.arrival_time).max().unwrap_or(0);
    for job in jobs {
        let io_episodes = if tracks_io && job.io.performs_io() {
            job.burst.saturating_sub(1) / job.io.period
        } else {
            0
        };
        horizon = io_episodes
            .checked_mul(job.io.duration)
            .and_then(|io| io.checked_add(job.burst))
            .and_then(|busy| horizon.checked_add(busy))
            .ok_or(SimError::TimelineOverflow { pid: job.pid })?;
    }
    Ok(())
}
