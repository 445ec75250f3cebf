use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

use crate::{
    core::{Pid, Ticks},
    memory::{DEFAULT_PARTITION_SIZES, PartitionTable},
    scheduler::{DEFAULT_QUANTUM, SchedParams},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    /// Non-preemptive priority, one tick per iteration.
    #[default]
    Priority,
    /// Priority with a quantum and event jumps.
    PriorityRr,
    /// FIFO round-robin, no I/O.
    RoundRobin,
}

/// Ready-queue comparator for the priority disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityOrder {
    /// Smaller priority value first (pid when unset), then earlier arrival.
    #[default]
    LowestValue,
    /// Earlier arrival first.
    EarliestArrival,
    /// Later arrival first.
    LatestArrival,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("quantum must be positive")]
    ZeroQuantum,
    #[error("partition table is empty")]
    NoPartitions,
    #[error("partition {number} has size 0")]
    EmptyPartition { number: u32 },
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("invalid config {path}: {reason}")]
    Parse { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub discipline: Discipline,
    pub quantum: Ticks,
    pub order: PriorityOrder,
    pub partitions: Vec<u32>,
    /// Largest pid accepted. `None` accepts any pid.
    pub max_pid: Option<Pid>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            discipline: Discipline::default(),
            quantum: DEFAULT_QUANTUM,
            order: PriorityOrder::default(),
            partitions: DEFAULT_PARTITION_SIZES.to_vec(),
            max_pid: None,
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        self.partition_table().map(|_| ())
    }

    pub fn partition_table(&self) -> Result<PartitionTable, ConfigError> {
        PartitionTable::new(&self.partitions)
    }

    pub fn sched_params(&self) -> SchedParams {
        SchedParams {
            quantum: self.quantum,
            order: self.order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.quantum, 100);
        assert_eq!(config.partitions, vec![40, 25, 15, 10, 8, 2]);
    }

    #[test]
    fn zero_quantum_is_fatal() {
        let config = SimConfig {
            quantum: 0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroQuantum));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"discipline": "round-robin", "quantum": 4}"#).unwrap();
        assert_eq!(config.discipline, Discipline::RoundRobin);
        assert_eq!(config.quantum, 4);
        assert_eq!(config.order, PriorityOrder::LowestValue);
        assert_eq!(config.partitions.len(), 6);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<SimConfig>(r#"{"quantom": 4}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn load_reports_path_on_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        fs::write(&path, "{ not json").unwrap();

        match SimConfig::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert!(p.ends_with("sim.json")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
