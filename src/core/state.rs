use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use std::{collections::VecDeque, fmt};

use super::event::SchedCoreEvent;
use crate::sim::job::{IoProfile, Job};

// Index into the process table
pub type TaskId = usize;
pub type Pid = u32;
pub type Ticks = u64;
new_key_type! {
    pub struct DsqId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcState {
    New,
    Ready,
    Running,
    Waiting,
    Terminated,
}

impl ProcState {
    /// Whether `self -> to` is an edge of the process state machine.
    pub fn can_transition_to(self, to: ProcState) -> bool {
        use ProcState::*;
        matches!(
            (self, to),
            (New, Ready)
                | (Ready, Running)
                | (Running, Terminated)
                | (Running, Waiting)
                | (Running, Ready)
                | (Waiting, Ready)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcState::New => "NEW",
            ProcState::Ready => "READY",
            ProcState::Running => "RUNNING",
            ProcState::Waiting => "WAITING",
            ProcState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Process control block. Identity fields are fixed once the record is
/// created; everything else is mutated only through `KernelCtx`.
#[derive(Debug)]
pub struct Process {
    pub id: TaskId,
    pub pid: Pid,
    pub arrival_time: Ticks,
    pub burst: Ticks,
    pub remaining: Ticks,
    pub priority: Option<u32>,
    pub io: IoProfile,
    pub mem_size: u32,
    pub state: ProcState,
    pub allocated_slice: Option<Ticks>,
    pub start_time: Option<Ticks>,
    pub completion_time: Option<Ticks>,
}

/// CPU ticks left before a process that performs I/O blocks again. The
/// completion time of a pending I/O lives only in its `WaitEntry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoTracker {
    pub until_trigger: Ticks,
}

/// Ready-queue ordering key. Compared lexicographically, smallest first.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct Rank {
    pub primary: u64,
    pub secondary: u64,
    pub seq: u64,
}

// KeyedPriorityQueue is a max-heap, so we need to flip-flop Rank's Ord
impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (other.primary, other.secondary, other.seq).cmp(&(
            self.primary,
            self.secondary,
            self.seq,
        ))
    }
}

#[derive(Debug)]
pub enum Dsq {
    Fifo {
        tasks: VecDeque<TaskId>,
    },
    Priq {
        tasks: KeyedPriorityQueue<TaskId, Rank>,
    },
}

impl Dsq {
    pub fn new_fifo() -> Self {
        Self::Fifo {
            tasks: VecDeque::new(),
        }
    }

    pub fn new_priq() -> Self {
        Self::Priq {
            tasks: KeyedPriorityQueue::new(),
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        match self {
            Self::Fifo { tasks } => tasks.contains(&task_id),
            Self::Priq { tasks } => tasks.iter().any(|t| *t.0 == task_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitEntry {
    pub task: TaskId,
    pub done_at: Ticks,
}

#[derive(Debug)]
pub struct KernelCtx {
    pub now: Ticks,
    pub current: Option<TaskId>,
    pub tasks: Vec<Process>,
    pub io: FxHashMap<TaskId, IoTracker>,
    pub dsqs: SlotMap<DsqId, Dsq>,
    pub task_to_dsq: FxHashMap<TaskId, DsqId>,
    pub global_dsq_id: DsqId,
    pub local_dsq_id: DsqId,
    pub wait_queue: Vec<WaitEntry>,

    // Monotonic enqueue counter; final tie-break for ordered DSQs
    next_seq: u64,
    events: Vec<SchedCoreEvent>,
}

impl KernelCtx {
    pub fn new() -> Self {
        let mut dsqs = SlotMap::with_capacity_and_key(3);
        let global_dsq_id = dsqs.insert(Dsq::new_fifo());
        let local_dsq_id = dsqs.insert(Dsq::new_fifo());

        Self {
            now: 0,
            current: None,
            tasks: Vec::new(),
            io: FxHashMap::default(),
            dsqs,
            task_to_dsq: FxHashMap::default(),
            global_dsq_id,
            local_dsq_id,
            wait_queue: Vec::new(),
            next_seq: 0,
            events: Vec::new(),
        }
    }

    /// Register a process in NEW. Returns its index in the process table.
    pub fn create_task(&mut self, job: &Job) -> TaskId {
        let id = self.tasks.len();

        let task = Process {
            id,
            pid: job.pid,
            arrival_time: job.arrival_time,
            burst: job.burst,
            remaining: job.burst,
            priority: job.priority,
            io: job.io,
            mem_size: job.mem_size,
            state: ProcState::New,
            allocated_slice: None,
            start_time: None,
            completion_time: None,
        };

        if job.io.performs_io() {
            self.io.insert(
                id,
                IoTracker {
                    until_trigger: job.io.period,
                },
            );
        }

        self.tasks.push(task);

        id
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    pub fn create_dsq_priq(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_priq())
    }

    /// Next value of the enqueue counter.
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn dsq_push(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks, rank: Option<Rank>) {
        assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Task {task_id} already present in some DSQ"
        );

        let task = self.task_mut(task_id);
        debug_assert!(
            task.state == ProcState::Ready,
            "Task {task_id} must be Ready when enqueued"
        );

        task.allocated_slice = Some(slice);
        let dsq = self.dsqs.get_mut(dsq_id).expect("Unknown DSQ");

        match dsq {
            Dsq::Fifo { tasks } => tasks.push_back(task_id),
            Dsq::Priq { tasks } => {
                tasks.push(
                    task_id,
                    rank.expect("Attempted to push to a priority DSQ with no rank"),
                );
            }
        };

        self.task_to_dsq.insert(task_id, dsq_id);
    }

    pub fn dsq_push_fifo(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks) {
        self.dsq_push(dsq_id, task_id, slice, None);
    }

    pub fn dsq_push_priq(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks, rank: Rank) {
        self.dsq_push(dsq_id, task_id, slice, Some(rank));
    }

    pub fn dsq_pop(&mut self, dsq_id: DsqId) -> Option<TaskId> {
        let dsq = self.dsqs.get_mut(dsq_id)?;
        let task = match dsq {
            Dsq::Fifo { tasks } => tasks.pop_front(),
            Dsq::Priq { tasks } => tasks.pop().map(|t| t.0),
        }?;

        let removed = self.task_to_dsq.remove(&task);
        debug_assert!(removed.is_some(), "Task {task} missing DSQ membership");

        Some(task)
    }

    pub fn dsq_move_to_local(&mut self, dsq_id: DsqId) {
        if let Some(task) = self.dsq_pop(dsq_id) {
            let slice = self
                .task(task)
                .allocated_slice
                .expect("Task on DSQ must have slice");
            self.dsq_push_fifo(self.local_dsq(), task, slice);
        }
    }

    pub fn task(&self, task_id: TaskId) -> &Process {
        &self.tasks[task_id]
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> &mut Process {
        &mut self.tasks[task_id]
    }

    pub fn global_dsq(&self) -> DsqId {
        self.global_dsq_id
    }

    pub fn local_dsq(&self) -> DsqId {
        self.local_dsq_id
    }

    pub fn cpu_is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Processes that are Ready, Running or Waiting.
    pub fn active_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| {
                matches!(
                    t.state,
                    ProcState::Ready | ProcState::Running | ProcState::Waiting
                )
            })
            .count()
    }

    pub fn all_terminated(&self) -> bool {
        self.tasks
            .iter()
            .all(|t| t.state == ProcState::Terminated)
    }

    // Every state change funnels through here so the trace can't drift from
    // the process table.
    fn set_state(&mut self, task_id: TaskId, to: ProcState) -> ProcState {
        let now = self.now;
        let task = &mut self.tasks[task_id];
        let from = task.state;
        debug_assert!(
            from.can_transition_to(to),
            "Illegal transition {from} -> {to} for pid {}",
            task.pid
        );
        task.state = to;
        let pid = task.pid;

        tracing::debug!(time = now, pid, %from, %to, "state change");
        self.events.push(SchedCoreEvent::TaskStateChange {
            time: now,
            pid,
            from,
            to,
        });
        from
    }

    pub fn mark_ready(&mut self, task_id: TaskId) {
        debug_assert!(
            self.current != Some(task_id),
            "Task {task_id} still owns the CPU"
        );
        self.set_state(task_id, ProcState::Ready);
    }

    pub fn mark_waiting(&mut self, task_id: TaskId, done_at: Ticks) {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Blocking task {} that is still enqueued",
            task_id
        );
        self.set_state(task_id, ProcState::Waiting);
        self.wait_queue.push(WaitEntry {
            task: task_id,
            done_at,
        });
    }

    pub fn mark_completed(&mut self, task_id: TaskId, completion_time: Ticks) {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Completing task {} that is still enqueued",
            task_id
        );
        debug_assert_eq!(
            self.tasks[task_id].remaining, 0,
            "Task {task_id} completed with CPU time left"
        );

        self.set_state(task_id, ProcState::Terminated);
        self.tasks[task_id].completion_time = Some(completion_time);
    }

    pub fn set_running(&mut self, task_id: TaskId) -> ProcState {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Running task {task_id} must not be enqueued"
        );
        debug_assert!(self.current.is_none(), "CPU already running a task");

        self.current = Some(task_id);
        let now = self.now;
        let task = self.task_mut(task_id);
        task.start_time.get_or_insert(now);
        self.set_state(task_id, ProcState::Running)
    }

    pub fn clear_cpu(&mut self) {
        self.current = None;
    }

    /// Remove and return wait-queue entries whose I/O has finished, in the
    /// order they entered the queue.
    pub fn take_due_waiters(&mut self) -> Vec<TaskId> {
        let now = self.now;
        let mut due = Vec::new();
        self.wait_queue.retain(|entry| {
            if entry.done_at <= now {
                due.push(entry.task);
                false
            } else {
                true
            }
        });
        due
    }

    pub fn emit(&mut self, event: SchedCoreEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<SchedCoreEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for KernelCtx {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(pid: Pid, burst: Ticks) -> Job {
        Job {
            pid,
            arrival_time: 0,
            burst,
            io: IoProfile::none(),
            priority: None,
            mem_size: 1,
        }
    }

    #[test]
    fn state_machine_edges() {
        use ProcState::*;
        assert!(New.can_transition_to(Ready));
        assert!(Waiting.can_transition_to(Ready));
        assert!(!New.can_transition_to(Running));
        assert!(!Ready.can_transition_to(Waiting));
        assert!(!Terminated.can_transition_to(Ready));
        assert!(!Running.can_transition_to(Running));
    }

    #[test]
    fn rank_orders_smallest_first_in_priq() {
        let mut ctx = KernelCtx::new();
        let dsq = ctx.create_dsq_priq();
        for (pid, prio) in [(1, 5), (2, 1), (3, 5)] {
            let id = ctx.create_task(&job(pid, 1));
            ctx.mark_ready(id);
            let seq = ctx.next_seq();
            ctx.dsq_push_priq(
                dsq,
                id,
                1,
                Rank {
                    primary: prio,
                    secondary: 0,
                    seq,
                },
            );
        }

        let popped: Vec<TaskId> = std::iter::from_fn(|| ctx.dsq_pop(dsq)).collect();
        let order: Vec<Pid> = popped.iter().map(|&id| ctx.task(id).pid).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert!(ctx.task_to_dsq.is_empty());
    }

    #[test]
    fn due_waiters_keep_queue_order() {
        let mut ctx = KernelCtx::new();
        let ids: Vec<TaskId> = (0..3).map(|p| ctx.create_task(&job(p, 4))).collect();
        for &id in &ids {
            ctx.mark_ready(id);
            ctx.set_running(id);
            ctx.clear_cpu();
        }
        ctx.mark_waiting(ids[0], 7);
        ctx.mark_waiting(ids[1], 3);
        ctx.mark_waiting(ids[2], 5);

        ctx.advance_time(5);
        assert_eq!(ctx.take_due_waiters(), vec![ids[1], ids[2]]);
        assert_eq!(ctx.wait_queue.len(), 1);
    }

    #[test]
    fn transitions_are_recorded_as_events() {
        let mut ctx = KernelCtx::new();
        let id = ctx.create_task(&job(9, 0));
        ctx.mark_ready(id);
        ctx.set_running(id);
        assert_eq!(ctx.task(id).start_time, Some(0));

        let events = ctx.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            SchedCoreEvent::TaskStateChange {
                pid: 9,
                from: ProcState::Ready,
                to: ProcState::Running,
                ..
            }
        ));
        assert!(ctx.drain_events().is_empty());
    }
}
