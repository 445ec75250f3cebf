use super::state::{KernelCtx, ProcState};
use crate::memory::PartitionTable;

/// Debug-build invariant checker, run after every loop iteration.
#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, core: &KernelCtx, partitions: &PartitionTable) {
        self.step += 1;

        let running = core
            .tasks
            .iter()
            .filter(|t| t.state == ProcState::Running)
            .count();
        debug_assert!(running <= 1, "{running} processes Running at once");

        if let Some(task_id) = core.current {
            debug_assert_eq!(
                core.task(task_id).state,
                ProcState::Running,
                "cpu.current task {task_id} must be Running"
            );
        } else {
            debug_assert_eq!(running, 0, "Running process without the CPU");
        }

        for (&task_id, &dsq_id) in &core.task_to_dsq {
            let task = core.task(task_id);
            debug_assert_eq!(
                task.state,
                ProcState::Ready,
                "Task {task_id} on DSQ {dsq_id:?} must be Ready"
            );
            if let Some(dsq) = core.dsqs.get(dsq_id) {
                debug_assert!(
                    dsq.contains(task_id),
                    "task_to_dsq claims task {task_id} in DSQ {dsq_id:?}, but queue does not contain it"
                );
            } else {
                debug_assert!(false, "task_to_dsq references unknown DSQ {dsq_id:?}");
            }
        }

        for entry in &core.wait_queue {
            debug_assert_eq!(
                core.task(entry.task).state,
                ProcState::Waiting,
                "Wait queue holds non-waiting task {}",
                entry.task
            );
        }

        for task in &core.tasks {
            let held = partitions.held_by(task.pid).count();
            let should_hold = matches!(
                task.state,
                ProcState::Ready | ProcState::Running | ProcState::Waiting
            );
            debug_assert_eq!(
                held,
                usize::from(should_hold),
                "pid {} in {} holds {held} partitions",
                task.pid,
                task.state
            );
            debug_assert!(
                task.remaining <= task.burst,
                "pid {} remaining exceeds burst",
                task.pid
            );
        }
    }
}
