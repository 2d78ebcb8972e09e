//! Runtime settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use weft_core::ManagerConfig;

/// Settings for one demo run, loaded from JSON. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Cycles to run before exiting.
    pub ticks: u64,
    /// Moving entities spawned before the first cycle.
    pub entities: usize,
    /// Log positions every N cycles; 0 disables.
    pub log_every: u64,
    /// Give every entity a lifetime of this many cycles.
    pub despawn_after: Option<u32>,
    pub manager: ManagerConfig,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            ticks: 10,
            entities: 1,
            log_every: 1,
            despawn_after: None,
            manager: ManagerConfig::default(),
        }
    }
}

impl RuntimeSettings {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}
