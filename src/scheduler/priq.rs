use super::{KernelCtx, SchedParams, Scheduler, SliceExpiry, TICK_SLICE, TaskId};
use crate::{
    config::PriorityOrder,
    core::{DsqId, Process, Rank, Ticks},
};

// Processes without a priority rank after every explicit one
const NO_PRIORITY: u64 = u64::MAX;

/// Ordering key of `task` under `order`. `seq` breaks every remaining tie
/// in enqueue order.
pub fn rank_of(order: PriorityOrder, task: &Process, seq: u64) -> Rank {
    match order {
        PriorityOrder::LowestValue => Rank {
            primary: task.priority.map_or(NO_PRIORITY, u64::from),
            secondary: u64::from(task.pid),
            seq,
        },
        PriorityOrder::EarliestArrival => Rank {
            primary: task.arrival_time,
            secondary: 0,
            seq,
        },
        PriorityOrder::LatestArrival => Rank {
            primary: u64::MAX - task.arrival_time,
            secondary: 0,
            seq,
        },
    }
}

fn push_ranked(ctx: &mut KernelCtx, dsq: DsqId, order: PriorityOrder, task: TaskId, slice: Ticks) {
    let seq = ctx.next_seq();
    let rank = rank_of(order, ctx.task(task), seq);
    ctx.dsq_push_priq(dsq, task, slice, rank);
}

/// Non-preemptive priority at tick granularity. The head of the ordered
/// ready queue is chosen only when the CPU goes idle and then keeps the CPU
/// one tick at a time until it finishes or starts I/O.
pub struct PriorityScheduler {
    ready: DsqId,
    order: PriorityOrder,
}

impl Scheduler for PriorityScheduler {
    fn init(ctx: &mut KernelCtx, params: &SchedParams) -> Self {
        Self {
            ready: ctx.create_dsq_priq(),
            order: params.order,
        }
    }

    fn name(&self) -> &'static str {
        "priority"
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId) {
        push_ranked(ctx, self.ready, self.order, task, TICK_SLICE);
    }

    fn dispatch(&mut self, ctx: &mut KernelCtx) {
        ctx.dsq_move_to_local(self.ready);
    }

    fn on_slice_expiry(&self) -> SliceExpiry {
        SliceExpiry::Continue
    }
}

/// Priority with a quantum. Each dispatch runs for up to one quantum, cut
/// short by completion or the next I/O trigger; expired processes are
/// re-ranked on their way back into the ready queue.
pub struct PriorityRrScheduler {
    ready: DsqId,
    order: PriorityOrder,
    quantum: Ticks,
}

impl Scheduler for PriorityRrScheduler {
    fn init(ctx: &mut KernelCtx, params: &SchedParams) -> Self {
        Self {
            ready: ctx.create_dsq_priq(),
            order: params.order,
            quantum: params.quantum,
        }
    }

    fn name(&self) -> &'static str {
        "priority-rr"
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId) {
        push_ranked(ctx, self.ready, self.order, task, self.quantum);
    }

    fn dispatch(&mut self, ctx: &mut KernelCtx) {
        ctx.dsq_move_to_local(self.ready);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::job::{IoProfile, Job};

    fn ready_task(ctx: &mut KernelCtx, pid: u32, arrival: Ticks, priority: Option<u32>) -> TaskId {
        let id = ctx.create_task(&Job {
            pid,
            arrival_time: arrival,
            burst: 10,
            io: IoProfile::none(),
            priority,
            mem_size: 1,
        });
        ctx.mark_ready(id);
        id
    }

    fn drain_order<S: Scheduler>(ctx: &mut KernelCtx, sched: &mut S) -> Vec<u32> {
        let mut order = Vec::new();
        loop {
            sched.dispatch(ctx);
            let local = ctx.local_dsq();
            match ctx.dsq_pop(local) {
                Some(id) => order.push(ctx.task(id).pid),
                None => break,
            }
        }
        order
    }

    #[test]
    fn lowest_value_breaks_ties_by_pid() {
        let mut ctx = KernelCtx::new();
        let mut sched = PriorityScheduler::init(&mut ctx, &SchedParams::default());
        let a = ready_task(&mut ctx, 4, 3, Some(2));
        let b = ready_task(&mut ctx, 5, 1, Some(2));
        let c = ready_task(&mut ctx, 6, 0, Some(9));
        let d = ready_task(&mut ctx, 7, 1, Some(2));
        for id in [a, b, c, d] {
            sched.enqueue(&mut ctx, id);
        }

        assert_eq!(drain_order(&mut ctx, &mut sched), vec![4, 5, 7, 6]);
    }

    #[test]
    fn missing_priority_ranks_after_explicit_ones() {
        let mut ctx = KernelCtx::new();
        let mut sched = PriorityScheduler::init(&mut ctx, &SchedParams::default());
        let a = ready_task(&mut ctx, 30, 0, None);
        let b = ready_task(&mut ctx, 10, 0, None);
        let c = ready_task(&mut ctx, 20, 0, Some(15));
        let d = ready_task(&mut ctx, 40, 0, Some(0));
        for id in [a, b, c, d] {
            sched.enqueue(&mut ctx, id);
        }

        assert_eq!(drain_order(&mut ctx, &mut sched), vec![40, 20, 10, 30]);
    }

    #[test]
    fn latest_arrival_order_reverses_arrivals() {
        let mut ctx = KernelCtx::new();
        let params = SchedParams {
            order: PriorityOrder::LatestArrival,
            ..SchedParams::default()
        };
        let mut sched = PriorityRrScheduler::init(&mut ctx, &params);
        let a = ready_task(&mut ctx, 1, 0, None);
        let b = ready_task(&mut ctx, 2, 8, None);
        let c = ready_task(&mut ctx, 3, 4, None);
        for id in [a, b, c] {
            sched.enqueue(&mut ctx, id);
        }

        assert_eq!(ctx.task(b).allocated_slice, Some(params.quantum));
        assert_eq!(drain_order(&mut ctx, &mut sched), vec![2, 3, 1]);
    }

    #[test]
    fn earliest_arrival_order_keeps_enqueue_order_on_ties() {
        let mut ctx = KernelCtx::new();
        let params = SchedParams {
            order: PriorityOrder::EarliestArrival,
            ..SchedParams::default()
        };
        let mut sched = PriorityScheduler::init(&mut ctx, &params);
        let a = ready_task(&mut ctx, 3, 5, Some(0));
        let b = ready_task(&mut ctx, 2, 2, None);
        let c = ready_task(&mut ctx, 1, 5, Some(0));
        let d = ready_task(&mut ctx, 4, 0, Some(9));
        for id in [a, b, c, d] {
            sched.enqueue(&mut ctx, id);
        }

        assert_eq!(ctx.task(a).allocated_slice, Some(TICK_SLICE));
        assert_eq!(drain_order(&mut ctx, &mut sched), vec![4, 2, 3, 1]);
    }
}
