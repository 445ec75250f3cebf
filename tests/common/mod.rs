#![allow(dead_code)]

use std::collections::BTreeSet;

use procsim::{
    Job, Pid, ProcState, SimOutput,
    sim::{MemoryLog, Trace},
};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .without_time()
        .try_init();
}

/// `(time, from, to)` triples for one pid.
pub fn transitions(trace: &Trace, pid: Pid) -> Vec<(u64, ProcState, ProcState)> {
    trace.for_pid(pid).map(|r| (r.time, r.from, r.to)).collect()
}

/// Every pid walks a legal path from NEW to TERMINATED.
pub fn assert_legal_paths(trace: &Trace, jobs: &[Job]) {
    for job in jobs {
        let states = trace.states_of(job.pid);
        assert_eq!(states.first(), Some(&ProcState::New), "pid {}", job.pid);
        assert_eq!(
            states.last(),
            Some(&ProcState::Terminated),
            "pid {}",
            job.pid
        );
        for pair in states.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "pid {}: illegal {} -> {}",
                job.pid,
                pair[0],
                pair[1]
            );
        }
    }
}

/// Replays the trace and checks the single-CPU and monotonic-time rules.
pub fn assert_single_cpu(trace: &Trace) {
    let mut running: BTreeSet<Pid> = BTreeSet::new();
    let mut last_time = 0;
    for record in trace.records() {
        assert!(record.time >= last_time, "time went backwards at {record:?}");
        last_time = record.time;

        if record.from == ProcState::Running {
            running.remove(&record.pid);
        }
        if record.to == ProcState::Running {
            running.insert(record.pid);
        }
        assert!(running.len() <= 1, "two processes running at t={}", record.time);
    }
}

/// RUNNING intervals add up to each burst exactly.
pub fn assert_runtime_matches_burst(trace: &Trace, jobs: &[Job]) {
    for job in jobs {
        assert_eq!(
            trace.total_runtime(job.pid),
            job.burst,
            "pid {} ran the wrong amount",
            job.pid
        );
    }
}

/// Each snapshot changes exactly one partition; a pid holds at most one
/// partition and holds it from admission until termination.
pub fn assert_partition_lifetimes(log: &MemoryLog, trace: &Trace, jobs: &[Job]) {
    let snapshots = log.snapshots();
    for pair in snapshots.windows(2) {
        let changed = pair[0]
            .partitions
            .iter()
            .zip(&pair[1].partitions)
            .filter(|(a, b)| a.occupant != b.occupant)
            .count();
        assert_eq!(changed, 1, "snapshot at t={} changed {changed}", pair[1].time);
    }

    for snapshot in snapshots {
        let mut seen = BTreeSet::new();
        for partition in &snapshot.partitions {
            if let Some(pid) = partition.occupant {
                assert!(seen.insert(pid), "pid {pid} holds two partitions");
            }
        }
    }

    for job in jobs {
        let admitted = trace
            .for_pid(job.pid)
            .find(|r| r.from == ProcState::New)
            .map(|r| r.time)
            .expect("admitted");
        let completed = trace.completion_time(job.pid).expect("completed");

        let holds = |i: usize| {
            snapshots[i]
                .partitions
                .iter()
                .any(|p| p.occupant == Some(job.pid))
        };
        let first = (0..snapshots.len()).find(|&i| holds(i)).expect("allocated");
        let released = (first..snapshots.len())
            .find(|&i| !holds(i))
            .expect("freed");
        assert_eq!(snapshots[first].time, admitted, "pid {}", job.pid);
        assert_eq!(snapshots[released].time, completed, "pid {}", job.pid);
        assert!(
            (released..snapshots.len()).all(|i| !holds(i)),
            "pid {} reacquired memory",
            job.pid
        );
    }
}

pub fn assert_all_invariants(output: &SimOutput, jobs: &[Job]) {
    assert_legal_paths(&output.trace, jobs);
    assert_single_cpu(&output.trace);
    assert_runtime_matches_burst(&output.trace, jobs);
    assert_partition_lifetimes(&output.memory_log, &output.trace, jobs);
}
