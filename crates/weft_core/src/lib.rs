//! Weft Core
//!
//! The entity/system binding engine:
//! - Component registry and bitmask matching
//! - Entity store with a deferred bind/remove lifecycle
//! - Systems with maintained query sets
//! - The system manager that drives each cycle

pub mod config;
pub mod ecs;

pub use config::ManagerConfig;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
