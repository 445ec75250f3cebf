use super::{
    event::SchedCoreEvent,
    observer::Observer,
    state::{KernelCtx, ProcState, TaskId, Ticks},
};
use crate::{
    memory::PartitionTable,
    scheduler::{SchedParams, Scheduler, SliceExpiry},
};

/// How a slice on the CPU ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    Terminated,
    Waiting { done_at: Ticks },
    Preempted,
    Continue,
}

/// Result of one CPU step: how far the clock moved and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuStep {
    Idle,
    Ran {
        task: TaskId,
        ran: Ticks,
        outcome: SliceOutcome,
    },
}

impl CpuStep {
    pub fn advanced(&self) -> Ticks {
        match self {
            CpuStep::Idle => 1,
            CpuStep::Ran { ran, .. } => *ran,
        }
    }
}

pub struct SchedCore<S: Scheduler> {
    pub ctx: KernelCtx,
    pub scheduler: S,
    observer: Observer,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(params: &SchedParams) -> Self {
        let mut ctx = KernelCtx::new();
        let scheduler = S::init(&mut ctx, params);
        let observer = Observer::new();
        Self {
            ctx,
            scheduler,
            observer,
        }
    }

    /// Give the CPU to a process (dispatching one if idle), run it for its
    /// slice and apply whatever transition the slice produced. Idles for one
    /// tick when nothing is runnable.
    pub fn run_cpu(&mut self) -> CpuStep {
        if self.ctx.cpu_is_idle() {
            self.try_schedule_cpu();
        }

        let task_id = match self.ctx.current {
            Some(task) => task,
            None => {
                let now = self.ctx.now;
                self.ctx.emit(SchedCoreEvent::CpuIdle { time: now });
                self.ctx.advance_time(1);
                return CpuStep::Idle;
            }
        };

        let ran = self.slice_length(task_id);
        self.ctx.task_mut(task_id).remaining -= ran;
        if let Some(io) = self.ctx.io.get_mut(&task_id) {
            io.until_trigger = io.until_trigger.saturating_sub(ran);
        }
        self.ctx.advance_time(ran);

        let outcome = self.finish_slice(task_id);
        CpuStep::Ran {
            task: task_id,
            ran,
            outcome,
        }
    }

    // Capped by the slice, the CPU time left and the next I/O trigger.
    fn slice_length(&self, task_id: TaskId) -> Ticks {
        let task = self.ctx.task(task_id);
        let slice = task
            .allocated_slice
            .expect("Running task must have an allocated slice");
        let mut ran = slice.min(task.remaining);

        if self.scheduler.tracks_io() {
            if let Some(io) = self.ctx.io.get(&task_id) {
                ran = ran.min(io.until_trigger);
            }
        }
        ran
    }

    fn finish_slice(&mut self, task_id: TaskId) -> SliceOutcome {
        let now = self.ctx.now;
        let task = self.ctx.task(task_id);

        if task.remaining == 0 {
            self.ctx.clear_cpu();
            self.ctx.mark_completed(task_id, now);
            return SliceOutcome::Terminated;
        }

        let io_duration = task.io.duration;
        if self.scheduler.tracks_io() {
            if let Some(io) = self.ctx.io.get_mut(&task_id) {
                if io.until_trigger == 0 {
                    let done_at = now.saturating_add(io_duration);
                    io.until_trigger = self.ctx.tasks[task_id].io.period;
                    self.ctx.clear_cpu();
                    self.ctx.mark_waiting(task_id, done_at);
                    return SliceOutcome::Waiting { done_at };
                }
            }
        }

        match self.scheduler.on_slice_expiry() {
            SliceExpiry::Continue => SliceOutcome::Continue,
            SliceExpiry::Requeue => {
                self.ctx.clear_cpu();
                self.ctx.mark_ready(task_id);
                self.scheduler.enqueue(&mut self.ctx, task_id);
                SliceOutcome::Preempted
            }
        }
    }

    fn try_schedule_cpu(&mut self) {
        let local = self.ctx.local_dsq();
        let global = self.ctx.global_dsq();

        let task = self
            .ctx
            .dsq_pop(local)
            .or_else(|| self.ctx.dsq_pop(global))
            .or_else(|| {
                self.scheduler.dispatch(&mut self.ctx);
                self.ctx.dsq_pop(local)
            });

        if let Some(task) = task {
            self.ctx.set_running(task);
            if let Some(io) = self.ctx.io.get_mut(&task) {
                if io.until_trigger == 0 {
                    io.until_trigger = self.ctx.tasks[task].io.period;
                }
            }
        }
    }

    /// NEW -> READY after the partition has been allocated.
    pub fn admit_task(&mut self, task: TaskId) {
        debug_assert_eq!(self.ctx.task(task).state, ProcState::New);
        self.ctx.mark_ready(task);
        self.scheduler.enqueue(&mut self.ctx, task);
    }

    /// WAITING -> READY once the I/O completion time has been reached.
    pub fn wake_task(&mut self, task: TaskId) {
        debug_assert_eq!(self.ctx.task(task).state, ProcState::Waiting);
        self.ctx.mark_ready(task);
        self.scheduler.enqueue(&mut self.ctx, task);
    }

    /// Move every process whose I/O has completed back to READY.
    pub fn wake_due_waiters(&mut self) -> usize {
        let due = self.ctx.take_due_waiters();
        let woken = due.len();
        for task in due {
            self.wake_task(task);
        }
        woken
    }

    pub fn observe(&mut self, partitions: &PartitionTable) {
        self.observer.observe(&self.ctx, partitions);
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
