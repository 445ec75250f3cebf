//! procsim: run a process scheduling simulation over an input file.

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, bail};
use clap::Parser;

use procsim::{
    Discipline, PriorityOrder, RunOutcome, SimConfig,
    fmt::{render_memory_log, render_summary, render_trace},
    input::read_jobs,
    run_simulation,
    workload::{WorkloadSpec, bernoulli_jobs},
};

/// Simulate process scheduling with fixed memory partitions.
#[derive(Parser)]
#[command(name = "procsim")]
struct Cli {
    /// Process list, one `pid, memory, arrival, burst, io_period, io_duration[, priority]` per line.
    input: Option<PathBuf>,

    /// JSON file holding a serialized configuration. Flags below override it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Scheduling discipline.
    #[arg(short, long, value_enum)]
    discipline: Option<Discipline>,

    /// Quantum for the time-sliced disciplines.
    #[arg(short, long)]
    quantum: Option<u64>,

    /// Ready-queue ordering for the priority disciplines.
    #[arg(long, value_enum)]
    order: Option<PriorityOrder>,

    /// Partition sizes in table order, e.g. `40,25,15,10,8,2`.
    #[arg(long, value_delimiter = ',')]
    partitions: Option<Vec<u32>>,

    /// Reject pids above this value.
    #[arg(long)]
    max_pid: Option<u32>,

    /// Synthesize a workload over this many ticks instead of reading INPUT.
    #[arg(long, value_name = "TICKS", conflicts_with = "input")]
    generate: Option<u64>,

    /// Seed for `--generate`.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Where to write the execution table.
    #[arg(long, default_value = "execution.txt")]
    execution: PathBuf,

    /// Where to write the memory log.
    #[arg(long, default_value = "memorylog.txt")]
    memory_log: PathBuf,

    /// Print per-process timing statistics to stdout.
    #[arg(long)]
    summary: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(RunOutcome::Completed) => ExitCode::SUCCESS,
        Ok(RunOutcome::Stalled(stall)) => {
            eprintln!(
                "error: processes {:?} can never be admitted (stalled at t={})",
                stall.pids, stall.time
            );
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<RunOutcome> {
    let config = build_config(cli)?;

    let jobs = match (&cli.input, cli.generate) {
        (_, Some(ticks)) => bernoulli_jobs(
            &WorkloadSpec {
                ticks,
                ..WorkloadSpec::default()
            },
            cli.seed,
        ),
        (Some(path), None) => read_jobs(path)?,
        (None, None) => bail!("missing required argument: <INPUT> (or --generate)"),
    };

    let output = run_simulation(jobs, &config).context("simulation setup failed")?;

    // Written even when stalled so the partial trace can be inspected.
    fs::write(&cli.execution, render_trace(&output.trace))
        .with_context(|| format!("failed to write {}", cli.execution.display()))?;
    fs::write(&cli.memory_log, render_memory_log(&output.memory_log))
        .with_context(|| format!("failed to write {}", cli.memory_log.display()))?;

    if cli.summary {
        print!("{}", render_summary(&output.summary));
    }

    Ok(output.outcome)
}

fn build_config(cli: &Cli) -> anyhow::Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if let Some(discipline) = cli.discipline {
        config.discipline = discipline;
    }
    if let Some(quantum) = cli.quantum {
        config.quantum = quantum;
    }
    if let Some(order) = cli.order {
        config.order = order;
    }
    if let Some(partitions) = &cli.partitions {
        config.partitions = partitions.clone();
    }
    if cli.max_pid.is_some() {
        config.max_pid = cli.max_pid;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
