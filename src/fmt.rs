use std::fmt::Write;

use crate::sim::{MemoryLog, MemorySnapshot, Summary, Trace, TraceRecord};

const EXEC_RULE: &str = "+------------------------------------------------+";
const MEM_RULE: &str = "-------------------------------------------";

pub fn exec_header() -> String {
    format!("{EXEC_RULE}\n|Time of Transition |PID | Old State | New State |\n{EXEC_RULE}\n")
}

pub fn exec_footer() -> String {
    format!("{EXEC_RULE}\n")
}

pub fn exec_row(record: &TraceRecord) -> String {
    format!(
        "|{:>18} |{:>3} |{:>10} |{:>10} |\n",
        record.time, record.pid, record.from, record.to
    )
}

/// Execution table bounded by header and footer rules.
pub fn render_trace(trace: &Trace) -> String {
    let mut out = exec_header();
    for record in trace.records() {
        out.push_str(&exec_row(record));
    }
    out.push_str(&exec_footer());
    out
}

pub fn render_snapshot(snapshot: &MemorySnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Memory Partition Status (t={}):", snapshot.time);
    let _ = writeln!(out, "Partition Number | Size | Occupied By (PID)");
    let _ = writeln!(out, "{MEM_RULE}");
    for partition in &snapshot.partitions {
        let occupant = match partition.occupant {
            Some(pid) => pid.to_string(),
            None => "Free".to_string(),
        };
        let _ = writeln!(
            out,
            "{:>16} | {:>4} | {:>16}",
            partition.number, partition.size, occupant
        );
    }
    let _ = writeln!(out, "{MEM_RULE}\n");
    out
}

pub fn render_memory_log(log: &MemoryLog) -> String {
    log.snapshots().iter().map(render_snapshot).collect()
}

pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} {:>8} {:>6} {:>6} {:>10} {:>9} {:>6} {:>6}",
        "pid", "arrival", "burst", "start", "completion", "turnaround", "ready", "io"
    );
    for p in &summary.processes {
        let _ = writeln!(
            out,
            "{:>5} {:>8} {:>6} {:>6} {:>10} {:>9} {:>6} {:>6}",
            p.pid,
            p.arrival_time,
            p.burst,
            p.start_time,
            p.completion_time,
            p.turnaround(),
            p.ready_time,
            p.io_time
        );
    }
    let _ = writeln!(out, "makespan: {} ticks", summary.makespan);
    let _ = writeln!(out, "average turnaround: {:.2} ticks", summary.mean_turnaround);
    let _ = writeln!(out, "average response: {:.2} ticks", summary.mean_response);
    let _ = writeln!(out, "average ready wait: {:.2} ticks", summary.mean_ready_wait);
    let _ = writeln!(out, "preemptions: {}", summary.preemptions);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SimConfig,
        sim::{Job, run_simulation},
    };

    #[test]
    fn single_process_table() {
        let output = run_simulation(vec![Job::new(1, 0, 5)], &SimConfig::default()).unwrap();
        let text = render_trace(&output.trace);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.first(), Some(&EXEC_RULE));
        assert_eq!(lines.last(), Some(&EXEC_RULE));
        assert_eq!(
            lines[3],
            "|                 0 |  1 |       NEW |     READY |"
        );
        assert_eq!(
            lines[5],
            "|                 5 |  1 |   RUNNING |TERMINATED |"
        );
    }

    #[test]
    fn empty_trace_is_just_the_frame() {
        assert_eq!(
            render_trace(&Trace::default()),
            format!("{}{}", exec_header(), exec_footer())
        );
    }

    #[test]
    fn free_partitions_are_labelled() {
        let output = run_simulation(vec![Job::new(3, 0, 1)], &SimConfig::default()).unwrap();
        let log = render_memory_log(&output.memory_log);
        let first = render_snapshot(&output.memory_log.snapshots()[0]);

        assert!(first.contains("               1 |   40 |                3"));
        assert!(first.contains("               2 |   25 |             Free"));
        assert_eq!(log.matches("Memory Partition Status").count(), 2);
    }
}
