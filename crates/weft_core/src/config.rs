//! Manager configuration

use crate::ecs::MAX_COMPONENTS;
use serde::{Deserialize, Serialize};

/// Tunables for a [`SystemManager`](crate::ecs::SystemManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Maximum distinct component kinds; must lie in `1..=64`.
    #[serde(default = "default_component_capacity")]
    pub component_capacity: usize,
    /// Charge each system's `update` to the metrics profiler.
    #[serde(default = "default_profile_systems")]
    pub profile_systems: bool,
}

fn default_component_capacity() -> usize {
    MAX_COMPONENTS
}

fn default_profile_systems() -> bool {
    true
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            component_capacity: default_component_capacity(),
            profile_systems: default_profile_systems(),
        }
    }
}
