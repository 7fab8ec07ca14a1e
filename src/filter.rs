//! Inventory row filtering
//!
//! Removes rows that should never reach a summary:
//! - reserved pseudo-partitions that span the whole cluster (`sched_system_all`)
//! - nodes whose state marks them out of service (`drained*`, `down*`)
//!
//! State matching is exact. Slurm decorates states with suffixes (`*`, `~`,
//! `#`, ...) and only the configured spellings are recognized.

use crate::config::InventoryConfig;
use std::collections::HashSet;

/// Why a row was excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Partition,
    State,
}

/// Decides which normalized rows are kept
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    partitions: HashSet<String>,
    states: HashSet<String>,
}

impl RowFilter {
    /// A filter that keeps every row
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a filter from the `[inventory]` configuration section
    pub fn from_config(config: &InventoryConfig) -> Self {
        Self {
            partitions: config.excluded_partitions.iter().cloned().collect(),
            states: config.excluded_states.iter().cloned().collect(),
        }
    }

    /// Exclude an additional partition
    pub fn exclude_partition(mut self, partition: impl Into<String>) -> Self {
        self.partitions.insert(partition.into());
        self
    }

    /// Exclude an additional state spelling
    pub fn exclude_state(mut self, state: impl Into<String>) -> Self {
        self.states.insert(state.into());
        self
    }

    /// `None` if the row is kept, otherwise the reason it is dropped
    pub fn check(&self, partition: &str, state: &str) -> Option<Exclusion> {
        if self.partitions.contains(partition) {
            Some(Exclusion::Partition)
        } else if self.states.contains(state) {
            Some(Exclusion::State)
        } else {
            None
        }
    }
}
