use serde::{Deserialize, Serialize};

use crate::{config::ConfigError, core::Pid};

/// Partition sizes used when no table is configured.
pub const DEFAULT_PARTITION_SIZES: [u32; 6] = [40, 25, 15, 10, 8, 2];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// 1-based position in the table.
    pub number: u32,
    pub size: u32,
    pub occupant: Option<Pid>,
}

impl Partition {
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    partitions: Vec<Partition>,
}

impl PartitionTable {
    pub fn new(sizes: &[u32]) -> Result<Self, ConfigError> {
        if sizes.is_empty() {
            return Err(ConfigError::NoPartitions);
        }
        if let Some(number) = sizes.iter().position(|&s| s == 0) {
            return Err(ConfigError::EmptyPartition {
                number: number as u32 + 1,
            });
        }

        let partitions = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| Partition {
                number: i as u32 + 1,
                size,
                occupant: None,
            })
            .collect();
        Ok(Self { partitions })
    }

    /// First-fit: the first free partition in table order that is large
    /// enough. Returns the partition number.
    pub fn allocate(&mut self, pid: Pid, size: u32) -> Option<u32> {
        debug_assert!(
            self.held_by(pid).next().is_none(),
            "pid {pid} already holds a partition"
        );
        let partition = self
            .partitions
            .iter_mut()
            .find(|p| p.is_free() && p.size >= size)?;
        partition.occupant = Some(pid);
        Some(partition.number)
    }

    /// Release the partition held by `pid`. Returns its number, or `None`
    /// when `pid` held nothing.
    pub fn free(&mut self, pid: Pid) -> Option<u32> {
        let partition = self
            .partitions
            .iter_mut()
            .find(|p| p.occupant == Some(pid))?;
        partition.occupant = None;
        Some(partition.number)
    }

    pub fn snapshot(&self) -> Vec<Partition> {
        self.partitions.clone()
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn held_by(&self, pid: Pid) -> impl Iterator<Item = &Partition> {
        self.partitions
            .iter()
            .filter(move |p| p.occupant == Some(pid))
    }

    pub fn largest(&self) -> u32 {
        self.partitions.iter().map(|p| p.size).max().unwrap_or(0)
    }

    /// Whether a request of `size` fits some partition once every
    /// partition is free.
    pub fn can_ever_fit(&self, size: u32) -> bool {
        size <= self.largest()
    }
}

impl Default for PartitionTable {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITION_SIZES
                .iter()
                .enumerate()
                .map(|(i, &size)| Partition {
                    number: i as u32 + 1,
                    size,
                    occupant: None,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit_takes_table_order_not_best_fit() {
        let mut table = PartitionTable::new(&[40, 10, 12]).unwrap();
        assert_eq!(table.allocate(1, 9), Some(1));
        assert_eq!(table.allocate(2, 9), Some(2));
        assert_eq!(table.allocate(3, 9), Some(3));
        assert_eq!(table.allocate(4, 1), None);
    }

    #[test]
    fn free_releases_only_the_owner() {
        let mut table = PartitionTable::default();
        assert_eq!(table.allocate(7, 20), Some(1));
        assert_eq!(table.allocate(8, 20), Some(2));
        assert_eq!(table.free(7), Some(1));
        assert_eq!(table.free(7), None);
        assert!(table.partitions()[0].is_free());
        assert_eq!(table.partitions()[1].occupant, Some(8));

        // Freed slot is reused by the next fitting request.
        assert_eq!(table.allocate(9, 30), Some(1));
    }

    #[test]
    fn oversized_request_never_fits() {
        let table = PartitionTable::default();
        assert_eq!(table.largest(), 40);
        assert!(table.can_ever_fit(40));
        assert!(!table.can_ever_fit(41));
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(PartitionTable::new(&[]), Err(ConfigError::NoPartitions));
        assert_eq!(
            PartitionTable::new(&[4, 0]),
            Err(ConfigError::EmptyPartition { number: 2 })
        );
    }
}
