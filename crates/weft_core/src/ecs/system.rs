//! # System: per-frame logic over maintained entity subsets
//!
//! A system declares one or more query sets during `init`. Each set is a
//! required-component mask plus the list of entities currently carrying every
//! required component. The [`SystemManager`](super::SystemManager) owns those
//! lists and keeps them in step with entity flags; the system only reads them
//! from inside `update`.
//!
//! ```ignore
//! #[derive(Default)]
//! struct MovementSystem;
//!
//! impl System for MovementSystem {
//!     fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
//!         init.require::<Position>()?.require::<Velocity>()?;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, ctx: &mut SystemContext<'_>) {
//!         for &entity in ctx.entities() {
//!             let Some(vel) = ctx.store().get::<Velocity>(entity).copied() else { continue };
//!             if let Some(pos) = ctx.store_mut().get_mut::<Position>(entity) {
//!                 pos.0 += vel.0;
//!             }
//!         }
//!     }
//! }
//! ```

use crate::ecs::{flags_match, Component, ComponentError, ComponentMask, ComponentRegistry, Entity, EntityStore};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Key of a query set within one system.
pub type SetId = u32;

/// The set used when no key is given.
pub const DEFAULT_SET: SetId = 0;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("query sets are sealed; requirements can only be declared during init")]
    Sealed,

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error("{0}")]
    Custom(String),
}

/// Unit of per-cycle logic driven by the system manager.
///
/// Both hooks default to no-ops. Systems must not keep component references
/// across cycles; the store may move data between updates.
pub trait System: AsAny {
    /// One-time setup; the only place query requirements can be declared.
    fn init(&mut self, _init: &mut SystemInit<'_>) -> Result<(), SystemError> {
        Ok(())
    }

    /// Called once per cycle after membership has been reconciled.
    fn update(&mut self, _ctx: &mut SystemContext<'_>) {}
}

/// Downcasting support for registered systems.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A required mask and the entities currently satisfying it.
#[derive(Debug, Default, Clone)]
pub struct QuerySet {
    required: ComponentMask,
    members: Vec<Entity>,
    index: HashSet<Entity>,
}

impl QuerySet {
    pub fn required(&self) -> ComponentMask {
        self.required
    }

    /// Members in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.members
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn add_entity(&mut self, entity: Entity) -> bool {
        if !self.index.insert(entity) {
            return false;
        }
        self.members.push(entity);
        true
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        if !self.index.remove(&entity) {
            return false;
        }
        self.members.retain(|member| *member != entity);
        true
    }
}

/// Membership changes produced by one reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub added: usize,
    pub removed: usize,
}

impl Reconciled {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

impl std::ops::AddAssign for Reconciled {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.removed += rhs.removed;
    }
}

/// All query sets declared by one system, ordered by key.
#[derive(Debug, Default)]
pub struct QuerySets {
    sets: BTreeMap<SetId, QuerySet>,
    sealed: bool,
}

impl QuerySets {
    /// OR `mask` into the requirement of `set`, creating the set if needed.
    pub(crate) fn require(&mut self, set: SetId, mask: ComponentMask) -> Result<(), SystemError> {
        if self.sealed {
            return Err(SystemError::Sealed);
        }
        self.sets.entry(set).or_default().required |= mask;
        Ok(())
    }

    pub fn required(&self, set: SetId) -> Option<ComponentMask> {
        self.sets.get(&set).map(QuerySet::required)
    }

    /// Current members of `set`; empty when the set was never declared.
    pub fn entities(&self, set: SetId) -> &[Entity] {
        self.sets
            .get(&set)
            .map(QuerySet::entities)
            .unwrap_or_default()
    }

    pub fn set(&self, set: SetId) -> Option<&QuerySet> {
        self.sets.get(&set)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SetId, &QuerySet)> {
        self.sets.iter().map(|(id, set)| (*id, set))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Insert into `set`; duplicate adds are ignored.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn add_entity(&mut self, entity: Entity, set: SetId) -> bool {
        self.sets
            .get_mut(&set)
            .is_some_and(|query| query.add_entity(entity))
    }

    /// Erase from `set` if present.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn remove_entity(&mut self, entity: Entity, set: SetId) -> bool {
        self.sets
            .get_mut(&set)
            .is_some_and(|query| query.remove_entity(entity))
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    /// Move `entity` between sets according to a flag change from `old` to `new`.
    ///
    /// Newly matching sets gain the entity, sets that stop matching lose it,
    /// everything else is left alone.
    pub(crate) fn reconcile(&mut self, entity: Entity, new: ComponentMask, old: ComponentMask) -> Reconciled {
        let mut changes = Reconciled::default();
        for query in self.sets.values_mut() {
            let now = flags_match(query.required, new);
            let before = flags_match(query.required, old);
            if now && !before && query.add_entity(entity) {
                changes.added += 1;
            } else if !now && before && query.remove_entity(entity) {
                changes.removed += 1;
            }
        }
        changes
    }
}

/// Handed to [`System::init`] for declaring requirements.
pub struct SystemInit<'a> {
    pub(crate) name: &'a str,
    pub(crate) queries: &'a mut QuerySets,
    pub(crate) registry: &'a ComponentRegistry,
}

impl<'a> SystemInit<'a> {
    /// Require `K` in the default set.
    pub fn require<K: Component>(&mut self) -> Result<&mut Self, SystemError> {
        self.require_in::<K>(DEFAULT_SET)
    }

    /// Require `K` in `set`. Requirements accumulate; repeating one is harmless.
    pub fn require_in<K: Component>(&mut self, set: SetId) -> Result<&mut Self, SystemError> {
        let mask = self.registry.mask_of::<K>()?;
        self.queries.require(set, mask)?;
        tracing::trace!(system = self.name, set, component = K::NAME, "declared requirement");
        Ok(self)
    }

    pub fn registry(&self) -> &ComponentRegistry {
        self.registry
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

/// Handed to [`System::update`] once per cycle.
///
/// Entity slices borrow the manager's membership lists, not the context, so
/// they can be iterated while the store is mutated through `store_mut`.
pub struct SystemContext<'a> {
    pub(crate) name: &'a str,
    pub(crate) queries: &'a QuerySets,
    pub(crate) store: &'a mut EntityStore,
    pub(crate) tick: u64,
}

impl<'a> SystemContext<'a> {
    /// Members of the default set.
    pub fn entities(&self) -> &'a [Entity] {
        self.queries.entities(DEFAULT_SET)
    }

    pub fn entities_in(&self, set: SetId) -> &'a [Entity] {
        self.queries.entities(set)
    }

    pub fn required(&self, set: SetId) -> Option<ComponentMask> {
        self.queries.required(set)
    }

    pub fn queries(&self) -> &'a QuerySets {
        self.queries
    }

    pub fn store(&self) -> &EntityStore {
        &*self.store
    }

    /// Structural changes made here are reconciled next cycle.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut *self.store
    }

    /// Number of the cycle being run, starting at 1.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn name(&self) -> &str {
        self.name
    }
}
