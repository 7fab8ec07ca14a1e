//! Deployment configuration loaded from TOML
//!
//! The public allow-list must be an explicit, reviewable set, so it lives in a
//! configuration file rather than being inferred from the data. A default
//! configuration is compiled into the binary for zero-config runs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Partition that only hosts data-transfer nodes; never published.
pub const TRANSFER_PARTITION: &str = "mit_data_transfer";

const DEFAULT_TOML: &str = include_str!("../config-default.toml");

/// Errors while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Public partition allow-list is empty")]
    EmptyAllowList,

    #[error("Duplicate public partition '{0}'")]
    DuplicatePartition(String),

    #[error("Null sentinel must not be empty")]
    EmptySentinel,
}

/// Row-level exclusions applied to the raw inventory
///
/// Omitted fields fall back to the cluster-wide exclusions; only an explicit
/// empty list turns them off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryConfig {
    #[serde(default = "default_excluded_partitions")]
    pub excluded_partitions: Vec<String>,

    #[serde(default = "default_excluded_states")]
    pub excluded_states: Vec<String>,
}

fn default_excluded_partitions() -> Vec<String> {
    vec!["sched_system_all".to_string()]
}

fn default_excluded_states() -> Vec<String> {
    vec!["drained*".to_string(), "down*".to_string()]
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            excluded_partitions: default_excluded_partitions(),
            excluded_states: default_excluded_states(),
        }
    }
}

/// Public extraction settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishConfig {
    /// Allow-list of partitions to publish, in output order
    pub partitions: Vec<String>,

    /// Additional partitions to drop even if allow-listed
    #[serde(default)]
    pub excluded_partitions: Vec<String>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_file_prefix() -> String {
    "node_info".to_string()
}

fn default_null_sentinel() -> String {
    "(null)".to_string()
}

/// Complete configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_null_sentinel")]
    pub null_sentinel: String,

    #[serde(default)]
    pub inventory: InventoryConfig,

    pub publish: PublishConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration embedded from `config-default.toml`
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_TOML)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.null_sentinel.is_empty() {
            return Err(ConfigError::EmptySentinel);
        }
        if self.publish.partitions.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        let mut seen = HashSet::new();
        for partition in &self.publish.partitions {
            if !seen.insert(partition.as_str()) {
                return Err(ConfigError::DuplicatePartition(partition.clone()));
            }
        }
        Ok(())
    }

    /// Allow-listed partitions that survive the exclusions, in allow-list order
    pub fn public_partitions(&self) -> Vec<&str> {
        self.publish
            .partitions
            .iter()
            .map(String::as_str)
            .filter(|p| *p != TRANSFER_PARTITION)
            .filter(|p| !self.publish.excluded_partitions.iter().any(|e| e == p))
            .collect()
    }
}
