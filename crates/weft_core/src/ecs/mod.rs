//! Entity/system binding engine.
//!
//! Components are plain values tagged with a dense id from a
//! [`ComponentRegistry`]. Every entity carries two bitmasks: the components it
//! has right now and the components it had at its last commit. Once per cycle
//! the [`SystemManager`] diffs those masks against each system's query sets,
//! runs the systems, and then tears down entities marked for removal.

mod component;
mod entity;
mod storage;
mod store;
mod system;
mod system_handle;
mod system_manager;
mod system_registration_error;
mod system_registry;

pub use component::{
    flags_match, Component, ComponentError, ComponentId, ComponentMask, ComponentMeta, ComponentRegistry,
    MAX_COMPONENTS,
};
pub use entity::Entity;
pub use store::{EntityMut, EntityRef, EntityState, EntityStore, StoreError};
pub use system::{
    AsAny, QuerySet, QuerySets, Reconciled, SetId, System, SystemContext, SystemError, SystemInit, DEFAULT_SET,
};
pub use system_handle::SystemHandle;
pub use system_manager::{CycleReport, ManagerError, SystemManager, SystemRunReport};
pub use system_registration_error::SystemRegistrationError;
