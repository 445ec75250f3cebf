use rand::prelude::*;

use crate::{core::Ticks, sim::job::Job};

/// Shape of a synthetic workload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadSpec {
    /// Arrivals are drawn for every tick in `0..ticks`.
    pub ticks: Ticks,
    pub p_arrival: f64,
    pub p_short: f64,
    pub short_burst: Ticks,
    pub long_burst: Ticks,
    /// Probability that a process performs I/O.
    pub p_io: f64,
    pub max_mem: u32,
    pub max_priority: u32,
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self {
            ticks: 500,
            p_arrival: 0.05,
            p_short: 0.3,
            short_burst: 20,
            long_burst: 150,
            p_io: 0.4,
            max_mem: 40,
            max_priority: 10,
        }
    }
}

/// Bernoulli arrivals with a two-point burst distribution. The same seed
/// always yields the same jobs.
pub fn bernoulli_jobs(spec: &WorkloadSpec, seed: u64) -> Vec<Job> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut jobs = Vec::new();

    for t in 0..spec.ticks {
        if rng.random::<f64>() < spec.p_arrival {
            let burst = if rng.random::<f64>() < spec.p_short {
                spec.short_burst
            } else {
                spec.long_burst
            };

            let mut job = Job::new(jobs.len() as u32 + 1, t, burst)
                .with_mem(rng.random_range(1..=spec.max_mem.max(1)))
                .with_priority(rng.random_range(0..=spec.max_priority));
            if rng.random::<f64>() < spec.p_io {
                let period = rng.random_range(1..=burst.max(1));
                let duration = rng.random_range(1..=10);
                job = job.with_io(period, duration);
            }
            jobs.push(job);
        }
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_jobs() {
        let spec = WorkloadSpec::default();
        assert_eq!(bernoulli_jobs(&spec, 7), bernoulli_jobs(&spec, 7));
    }

    #[test]
    fn jobs_respect_bounds() {
        let spec = WorkloadSpec {
            p_arrival: 0.5,
            ..WorkloadSpec::default()
        };
        let jobs = bernoulli_jobs(&spec, 1);
        assert!(!jobs.is_empty());
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(job.pid, i as u32 + 1);
            assert!(job.arrival_time < spec.ticks);
            assert!(job.burst == spec.short_burst || job.burst == spec.long_burst);
            assert!((1..=spec.max_mem).contains(&job.mem_size));
            assert!(job.io.period <= job.burst);
        }
    }
}
