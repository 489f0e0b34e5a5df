//! Replay configuration.

use serde::{Deserialize, Serialize};

/// How pointers into undeclared memory take part in aliasing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownVersionPolicy {
    /// Never pair a version-unknown pointer with anything
    #[default]
    NeverAlias,
    /// Pair version-unknown pointers that hold the same address
    MatchAddress,
}

/// What the slicer does once both sides reach the same record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Deactivate both sides at the merge (diagnostic mode)
    #[default]
    Stop,
    /// Keep growing both slices past the merge (reduction mode)
    Continue,
}

/// Replay engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Treatment of pointers whose address has no live allocation
    pub unknown_version_policy: UnknownVersionPolicy,
    /// Slicer behaviour after a merge
    pub merge_policy: MergePolicy,
    /// Records between progress reports (0 = never)
    pub progress_interval: u64,
    /// End a backward pass once both slicer sides have finished
    pub stop_when_inactive: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            unknown_version_policy: UnknownVersionPolicy::default(),
            merge_policy: MergePolicy::default(),
            progress_interval: 1 << 20,
            stop_when_inactive: true,
        }
    }
}

impl ReplayConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns the JSON error on malformed input
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
