// store.rs - Authoritative entity and component ownership
//
// The store owns every entity slot and every component value. It never
// touches system membership; instead it records which entities need their
// flags reconciled (`bindable`) and which are waiting to be torn down
// (`removable`). The system manager drains both lists once per cycle.

use crate::ecs::storage::{Column, ErasedColumn};
use crate::ecs::{Component, ComponentError, ComponentId, ComponentMask, ComponentRegistry, Entity};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("entity {entity} does not exist or has been removed")]
    StaleEntity { entity: Entity },

    #[error("entity {entity} is marked for removal and cannot change structure")]
    Despawning { entity: Entity },

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Where an entity is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    /// Created but `bind()` not yet called; invisible to systems.
    Unbound,
    /// Bound at least once; flag changes are reconciled every cycle.
    Bound,
    /// Waiting for the removal phase.
    Despawning,
}

struct EntitySlot {
    generation: u32,
    alive: bool,
    state: EntityState,
    current: ComponentMask,
    previous: ComponentMask,
    pending_bind: bool,
}

impl EntitySlot {
    fn fresh(generation: u32) -> Self {
        Self {
            generation,
            alive: true,
            state: EntityState::Unbound,
            current: ComponentMask::EMPTY,
            previous: ComponentMask::EMPTY,
            pending_bind: false,
        }
    }
}

/// Owns all entities and their component data.
pub struct EntityStore {
    registry: ComponentRegistry,
    slots: Vec<EntitySlot>,
    free: Vec<u32>,
    columns: HashMap<ComponentId, Box<dyn ErasedColumn>>,
    bindable: Vec<Entity>,
    removable: Vec<Entity>,
    live: usize,
}

impl EntityStore {
    pub fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            slots: Vec::new(),
            free: Vec::new(),
            columns: HashMap::new(),
            bindable: Vec::new(),
            removable: Vec::new(),
            live: 0,
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Allocate a new entity with no components.
    ///
    /// The entity stays invisible to systems until [`bind`](Self::bind).
    pub fn create(&mut self) -> Entity {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            *slot = EntitySlot::fresh(slot.generation);
            return Entity::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(EntitySlot::fresh(0));
        Entity::new(index, 0)
    }

    /// Create an entity and return a builder-style view onto it.
    ///
    /// ```ignore
    /// let entity = store
    ///     .spawn()
    ///     .add_component(Position::default())?
    ///     .add_component(Velocity::default())?
    ///     .bind()?;
    /// ```
    pub fn spawn(&mut self) -> EntityMut<'_> {
        let entity = self.create();
        EntityMut {
            store: self,
            entity,
        }
    }

    pub fn entity(&self, entity: Entity) -> Result<EntityRef<'_>, StoreError> {
        self.slot(entity)?;
        Ok(EntityRef {
            store: self,
            entity,
        })
    }

    pub fn entity_mut(&mut self, entity: Entity) -> Result<EntityMut<'_>, StoreError> {
        self.slot(entity)?;
        Ok(EntityMut {
            store: self,
            entity,
        })
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slot(entity).is_ok()
    }

    /// Number of live entities, bound or not.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn state(&self, entity: Entity) -> Result<EntityState, StoreError> {
        self.slot(entity).map(|slot| slot.state)
    }

    /// Components attached right now.
    pub fn flag(&self, entity: Entity) -> Result<ComponentMask, StoreError> {
        self.slot(entity).map(|slot| slot.current)
    }

    /// Components as of the last commit.
    pub fn old_flag(&self, entity: Entity) -> Result<ComponentMask, StoreError> {
        self.slot(entity).map(|slot| slot.previous)
    }

    /// Attach `value`, replacing any existing component of the same kind.
    ///
    /// The flag bit is set immediately; systems only notice after the next
    /// reconciliation.
    pub fn add_component<K: Component>(&mut self, entity: Entity, value: K) -> Result<(), StoreError> {
        self.structural_slot(entity)?;
        let id = self.registry.id_of::<K>()?;

        let stale = self
            .columns
            .get(&id)
            .is_some_and(|column| !column.as_any().is::<Column<K>>());
        if stale {
            // Only reachable when the registry was reset under a live store.
            self.columns.remove(&id);
        }
        if let Some(column) = self
            .columns
            .entry(id)
            .or_insert_with(|| Box::new(Column::<K>::new()))
            .as_any_mut()
            .downcast_mut::<Column<K>>()
        {
            column.insert(entity.index(), value);
        }

        let slot = self.structural_slot(entity)?;
        slot.current = slot.current.with(id);
        self.mark_dirty(entity);
        Ok(())
    }

    /// Detach the `K` component, returning it if present.
    pub fn remove_component<K: Component>(&mut self, entity: Entity) -> Result<Option<K>, StoreError> {
        self.structural_slot(entity)?;
        let Some(id) = self.registry.lookup::<K>() else {
            return Ok(None);
        };

        let removed = self
            .column_mut::<K>(id)
            .and_then(|column| column.take(entity.index()));

        let slot = self.structural_slot(entity)?;
        if slot.current.has(id) {
            slot.current = slot.current.without(id);
            self.mark_dirty(entity);
        }
        Ok(removed)
    }

    pub fn get<K: Component>(&self, entity: Entity) -> Option<&K> {
        self.slot(entity).ok()?;
        let id = self.registry.lookup::<K>()?;
        self.columns
            .get(&id)?
            .as_any()
            .downcast_ref::<Column<K>>()?
            .get(entity.index())
    }

    pub fn get_mut<K: Component>(&mut self, entity: Entity) -> Option<&mut K> {
        self.slot(entity).ok()?;
        let id = self.registry.lookup::<K>()?;
        self.column_mut::<K>(id)?.get_mut(entity.index())
    }

    pub fn has<K: Component>(&self, entity: Entity) -> bool {
        match (self.slot(entity), self.registry.lookup::<K>()) {
            (Ok(slot), Some(id)) => slot.current.has(id),
            _ => false,
        }
    }

    /// Make the entity visible to systems from the next reconciliation on.
    pub fn bind(&mut self, entity: Entity) -> Result<(), StoreError> {
        let slot = self.structural_slot(entity)?;
        slot.state = EntityState::Bound;
        self.enqueue_bind(entity);
        Ok(())
    }

    /// Mark the entity for removal at the end of the next cycle.
    ///
    /// Components stay readable (and systems keep seeing the entity) until the
    /// removal phase runs. Marking twice is a no-op.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), StoreError> {
        let slot = self.slot_mut(entity)?;
        if slot.state == EntityState::Despawning {
            return Ok(());
        }
        slot.state = EntityState::Despawning;
        self.removable.push(entity);
        Ok(())
    }

    /// Entities whose flags await reconciliation.
    pub fn bindable_entities(&self) -> &[Entity] {
        &self.bindable
    }

    /// Entities waiting for the removal phase.
    pub fn removable_entities(&self) -> &[Entity] {
        &self.removable
    }

    /// Commit the current flag as the reconciled one. Only the manager's
    /// reconciliation phase may call this.
    pub(crate) fn update_flags(&mut self, entity: Entity) -> Result<(), StoreError> {
        let slot = self.slot_mut(entity)?;
        slot.previous = slot.current;
        slot.pending_bind = false;
        Ok(())
    }

    /// Discard the entity and all of its components. The handle goes stale.
    ///
    /// Callers outside the crate go through [`despawn`](Self::despawn) so the
    /// manager can drop the entity from every query set first.
    pub(crate) fn remove(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.slot(entity)?;
        let index = entity.index();
        for column in self.columns.values_mut() {
            column.clear_row(index);
        }

        let slot = &mut self.slots[index as usize];
        slot.alive = false;
        slot.pending_bind = false;
        slot.current = ComponentMask::EMPTY;
        slot.previous = ComponentMask::EMPTY;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
        Ok(())
    }

    /// Drop bookkeeping for entities that have been reconciled or removed.
    ///
    /// Entries queued after this cycle's reconciliation (for example an entity
    /// bound from inside a system's `update`) survive until the next cycle.
    pub fn clear(&mut self) {
        let slots = &self.slots;
        let mut queued = HashSet::new();
        // An entity reconciled this cycle and changed again afterwards has a
        // stale entry ahead of its fresh one; keep one entry per entity.
        self.bindable.retain(|entity| {
            Self::lookup_slot(slots, *entity).is_some_and(|slot| slot.pending_bind) && queued.insert(*entity)
        });
        self.removable
            .retain(|entity| Self::lookup_slot(slots, *entity).is_some());
    }

    /// Number of stored values of kind `K`.
    pub fn component_count<K: Component>(&self) -> usize {
        self.registry
            .lookup::<K>()
            .and_then(|id| self.columns.get(&id))
            .map(|column| column.len())
            .unwrap_or(0)
    }

    fn column_mut<K: Component>(&mut self, id: ComponentId) -> Option<&mut Column<K>> {
        self.columns
            .get_mut(&id)?
            .as_any_mut()
            .downcast_mut::<Column<K>>()
    }

    fn mark_dirty(&mut self, entity: Entity) {
        let bound = self
            .slot(entity)
            .is_ok_and(|slot| slot.state == EntityState::Bound);
        if bound {
            self.enqueue_bind(entity);
        }
    }

    fn enqueue_bind(&mut self, entity: Entity) {
        let slot = &mut self.slots[entity.index() as usize];
        if !slot.pending_bind {
            slot.pending_bind = true;
            self.bindable.push(entity);
        }
    }

    fn lookup_slot(slots: &[EntitySlot], entity: Entity) -> Option<&EntitySlot> {
        slots
            .get(entity.index() as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation())
    }

    fn slot(&self, entity: Entity) -> Result<&EntitySlot, StoreError> {
        Self::lookup_slot(&self.slots, entity).ok_or(StoreError::StaleEntity { entity })
    }

    fn slot_mut(&mut self, entity: Entity) -> Result<&mut EntitySlot, StoreError> {
        self.slots
            .get_mut(entity.index() as usize)
            .filter(|slot| slot.alive && slot.generation == entity.generation())
            .ok_or(StoreError::StaleEntity { entity })
    }

    /// Slot of an entity whose component set may still change.
    fn structural_slot(&mut self, entity: Entity) -> Result<&mut EntitySlot, StoreError> {
        let slot = self.slot_mut(entity)?;
        if slot.state == EntityState::Despawning {
            return Err(StoreError::Despawning { entity });
        }
        Ok(slot)
    }
}

/// Read-only view of a single entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    store: &'a EntityStore,
    entity: Entity,
}

impl<'a> EntityRef<'a> {
    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn flag(&self) -> ComponentMask {
        self.store.flag(self.entity).unwrap_or_default()
    }

    pub fn old_flag(&self) -> ComponentMask {
        self.store.old_flag(self.entity).unwrap_or_default()
    }

    pub fn state(&self) -> Option<EntityState> {
        self.store.state(self.entity).ok()
    }

    pub fn get<K: Component>(&self) -> Option<&'a K> {
        self.store.get::<K>(self.entity)
    }

    pub fn has<K: Component>(&self) -> bool {
        self.store.has::<K>(self.entity)
    }
}

/// Mutable view of a single entity; chains component attachment before `bind`.
pub struct EntityMut<'a> {
    store: &'a mut EntityStore,
    entity: Entity,
}

impl<'a> EntityMut<'a> {
    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn flag(&self) -> ComponentMask {
        self.store.flag(self.entity).unwrap_or_default()
    }

    pub fn old_flag(&self) -> ComponentMask {
        self.store.old_flag(self.entity).unwrap_or_default()
    }

    pub fn get<K: Component>(&self) -> Option<&K> {
        self.store.get::<K>(self.entity)
    }

    pub fn get_mut<K: Component>(&mut self) -> Option<&mut K> {
        self.store.get_mut::<K>(self.entity)
    }

    pub fn add_component<K: Component>(self, value: K) -> Result<Self, StoreError> {
        self.store.add_component(self.entity, value)?;
        Ok(self)
    }

    pub fn remove_component<K: Component>(&mut self) -> Result<Option<K>, StoreError> {
        self.store.remove_component::<K>(self.entity)
    }

    /// Hand the entity over to reconciliation and return its handle.
    pub fn bind(self) -> Result<Entity, StoreError> {
        self.store.bind(self.entity)?;
        Ok(self.entity)
    }
}
