// system_manager.rs - Orchestrates registration, init and the update cycle
//
// One cycle runs four phases to completion:
//   1. reconcile every bindable entity against every query set, then commit
//   2. run each system's update in registration order
//   3. drop every removable entity from the sets it still belongs to, then
//      discard it from the store
//   4. clear the store's transient bookkeeping
//
// Membership lists are only touched in phases 1 and 3, so systems always see
// a flag-consistent view while they run.

use crate::config::ManagerConfig;
use crate::ecs::system_registry::{Registration, RegisteredSystem, SystemRegistry};
use crate::ecs::{
    ComponentError, ComponentMask, ComponentRegistry, Entity, EntityStore, QuerySets, Reconciled, SetId, StoreError,
    System, SystemContext, SystemError, SystemHandle, SystemInit, SystemRegistrationError,
};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use weft_metrics::{Counter, SystemProfiler};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("system manager is not initialized; call init() first")]
    NotInitialized,

    #[error("system manager has already been initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Registration(#[from] SystemRegistrationError),

    #[error("system '{system}' failed to initialize")]
    SystemInit {
        system: String,
        #[source]
        source: SystemError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Wall time of one system's `update`.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

/// Summary of one [`SystemManager::update`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleReport {
    pub tick: u64,
    /// Entities reconciled in phase 1.
    pub bound: usize,
    /// Entities discarded in phase 3.
    pub removed: usize,
    /// Set insertions across all systems.
    pub joined: usize,
    /// Set removals across all systems.
    pub left: usize,
    pub systems: Vec<SystemRunReport>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ManagerState {
    Registering,
    Live,
    /// A system's init failed; the manager cannot run.
    Failed,
}

/// Owns the entity store and every registered system.
///
/// ```ignore
/// let mut manager = SystemManager::new();
/// manager.register::<MovementSystem>()?;
/// manager.init()?;
///
/// manager
///     .store_mut()
///     .spawn()
///     .add_component(Position::default())?
///     .add_component(Velocity::default())?
///     .bind()?;
///
/// loop {
///     manager.update()?;
/// }
/// ```
pub struct SystemManager {
    store: EntityStore,
    registry: SystemRegistry,
    config: ManagerConfig,
    state: ManagerState,
    tick: u64,
    profiler: SystemProfiler,
    counters: Counter,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::with_store(EntityStore::new(ComponentRegistry::new()))
    }

    pub fn with_config(config: ManagerConfig) -> Result<Self, ManagerError> {
        let registry = ComponentRegistry::with_capacity(config.component_capacity)?;
        let mut manager = Self::with_store(EntityStore::new(registry));
        manager.config = config;
        Ok(manager)
    }

    /// Drive an existing store; component ids come from its registry.
    pub fn with_store(store: EntityStore) -> Self {
        Self {
            store,
            registry: SystemRegistry::new(),
            config: ManagerConfig::default(),
            state: ManagerState::Registering,
            tick: 0,
            profiler: SystemProfiler::new(),
            counters: Counter::new(),
        }
    }

    /// Register a default-constructed `S`.
    pub fn register<S: System + Default>(&mut self) -> Result<SystemHandle, SystemRegistrationError> {
        self.register_system(S::default())
    }

    /// Register `system`. A second instance of the same type is ignored and the
    /// existing handle is returned.
    pub fn register_system<S: System>(&mut self, system: S) -> Result<SystemHandle, SystemRegistrationError> {
        if self.state != ManagerState::Registering {
            return Err(SystemRegistrationError::ManagerLive {
                name: std::any::type_name::<S>().to_string(),
            });
        }

        match self.registry.register(system) {
            Registration::Added(handle) => {
                debug!(system = std::any::type_name::<S>(), %handle, "registered system");
                Ok(handle)
            }
            Registration::Existing(handle) => {
                warn!(system = std::any::type_name::<S>(), %handle, "system already registered, ignoring");
                Ok(handle)
            }
        }
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.registry.handle_of::<S>().is_some()
    }

    pub fn handle_of<S: System>(&self) -> Option<SystemHandle> {
        self.registry.handle_of::<S>()
    }

    pub fn system<S: System>(&self) -> Option<&S> {
        self.registry.get::<S>()
    }

    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.registry.get_mut::<S>()
    }

    /// Query sets declared by `S`.
    pub fn queries<S: System>(&self) -> Option<&QuerySets> {
        self.registry.entry_of::<S>().map(|entry| &entry.queries)
    }

    /// Current members of `set` in system `S`; empty if either is unknown.
    pub fn members<S: System>(&self, set: SetId) -> &[Entity] {
        self.queries::<S>().map(|queries| queries.entities(set)).unwrap_or_default()
    }

    /// Short names in registration (and update) order.
    pub fn system_names(&self) -> Vec<&str> {
        self.registry.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    pub fn is_live(&self) -> bool {
        self.state == ManagerState::Live
    }

    /// Run every system's `init` in registration order and seal its query sets.
    ///
    /// After this call no more systems can be registered. If a system fails,
    /// the manager stays unusable and the error names the system.
    pub fn init(&mut self) -> Result<(), ManagerError> {
        if self.state != ManagerState::Registering {
            return Err(ManagerError::AlreadyInitialized);
        }

        for entry in self.registry.iter_mut() {
            let RegisteredSystem {
                handle,
                name,
                system,
                queries,
            } = entry;

            let mut init = SystemInit {
                name: name.as_str(),
                queries: &mut *queries,
                registry: self.store.registry(),
            };
            if let Err(source) = system.init(&mut init) {
                self.state = ManagerState::Failed;
                return Err(ManagerError::SystemInit {
                    system: name.clone(),
                    source,
                });
            }
            queries.seal();

            for (set, query) in queries.iter() {
                debug!(
                    system = %name,
                    set,
                    required = %query.required(),
                    components = ?self.store.registry().describe(query.required()),
                    "query set declared"
                );
            }
            info!(system = %name, %handle, sets = queries.len(), "system initialized");
        }

        self.state = ManagerState::Live;
        Ok(())
    }

    /// Run one full cycle.
    pub fn update(&mut self) -> Result<CycleReport, ManagerError> {
        if self.state != ManagerState::Live {
            return Err(ManagerError::NotInitialized);
        }

        self.tick += 1;
        let mut report = CycleReport {
            tick: self.tick,
            ..CycleReport::default()
        };

        self.bind_pending(&mut report)?;
        self.run_systems(&mut report);
        self.remove_pending(&mut report)?;
        self.store.clear();

        self.counters.increment("cycles", 1);
        self.counters.increment("bound", report.bound as u64);
        self.counters.increment("removed", report.removed as u64);
        self.counters.increment("joined", report.joined as u64);
        self.counters.increment("left", report.left as u64);

        trace!(
            tick = report.tick,
            bound = report.bound,
            removed = report.removed,
            joined = report.joined,
            left = report.left,
            "cycle complete"
        );
        Ok(report)
    }

    fn bind_pending(&mut self, report: &mut CycleReport) -> Result<(), ManagerError> {
        let pending = self.store.bindable_entities().to_vec();
        for entity in pending {
            let (Ok(new), Ok(old)) = (self.store.flag(entity), self.store.old_flag(entity)) else {
                trace!(%entity, "skipping stale bindable entity");
                continue;
            };

            let changes = self.reconcile(entity, new, old);
            self.store.update_flags(entity)?;
            report.bound += 1;
            report.joined += changes.added;
            report.left += changes.removed;
        }
        Ok(())
    }

    fn run_systems(&mut self, report: &mut CycleReport) {
        let tick = self.tick;
        let profile = self.config.profile_systems;

        for entry in self.registry.iter_mut() {
            let RegisteredSystem {
                name,
                system,
                queries,
                ..
            } = entry;

            let mut ctx = SystemContext {
                name: name.as_str(),
                queries: &*queries,
                store: &mut self.store,
                tick,
            };

            let start = Instant::now();
            if profile {
                self.profiler.time_system(name.as_str(), || system.update(&mut ctx));
            } else {
                system.update(&mut ctx);
            }
            let elapsed = start.elapsed();

            report.systems.push(SystemRunReport {
                name: name.clone(),
                duration_ms: elapsed.as_secs_f64() * 1000.0,
            });
        }
    }

    fn remove_pending(&mut self, report: &mut CycleReport) -> Result<(), ManagerError> {
        let pending = self.store.removable_entities().to_vec();
        for entity in pending {
            let Ok(old) = self.store.old_flag(entity) else {
                trace!(%entity, "skipping stale removable entity");
                continue;
            };

            let changes = self.reconcile(entity, ComponentMask::EMPTY, old);
            self.store.remove(entity)?;
            report.removed += 1;
            report.left += changes.removed;
        }
        Ok(())
    }

    fn reconcile(&mut self, entity: Entity, new: ComponentMask, old: ComponentMask) -> Reconciled {
        let mut total = Reconciled::default();
        for entry in self.registry.iter_mut() {
            let changes = entry.queries.reconcile(entity, new, old);
            if !changes.is_empty() {
                trace!(
                    system = %entry.name,
                    %entity,
                    added = changes.added,
                    removed = changes.removed,
                    "membership changed"
                );
            }
            total += changes;
        }
        total
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Component registry shared with the store.
    pub fn registry(&self) -> &ComponentRegistry {
        self.store.registry()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Number of completed cycles.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }
}

impl Default for SystemManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::ecs::{flags_match, EntityState, DEFAULT_SET};

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct A(i32);
    define_component!(A);

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct B(i32);
    define_component!(B);

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct C;
    define_component!(C);

    /// Requires {A, B}; counts its hook invocations.
    #[derive(Default)]
    struct BothSystem {
        inits: u32,
        updates: u32,
        seen: Vec<usize>,
    }

    impl System for BothSystem {
        fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
            self.inits += 1;
            init.require::<A>()?.require::<B>()?;
            Ok(())
        }

        fn update(&mut self, ctx: &mut SystemContext<'_>) {
            self.updates += 1;
            self.seen.push(ctx.entities().len());
        }
    }

    /// Requires only A.
    #[derive(Default)]
    struct OnlyASystem;

    impl System for OnlyASystem {
        fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
            init.require::<A>()?;
            Ok(())
        }
    }

    /// Two sets: A in the default set, B in set 1.
    #[derive(Default)]
    struct SplitSystem;

    impl System for SplitSystem {
        fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
            init.require_in::<A>(DEFAULT_SET)?;
            init.require_in::<B>(1)?;
            Ok(())
        }
    }

    fn manager_with<S: System + Default>() -> SystemManager {
        let mut manager = SystemManager::new();
        manager.register::<S>().unwrap();
        manager
    }

    fn spawn_ab(manager: &mut SystemManager) -> Entity {
        manager
            .store_mut()
            .spawn()
            .add_component(A(1))
            .unwrap()
            .add_component(B(2))
            .unwrap()
            .bind()
            .unwrap()
    }

    /// Every member satisfies its set and every committed matching entity is a member.
    fn assert_membership_consistent(manager: &SystemManager, entities: &[Entity]) {
        for entry in manager.registry.iter() {
            for (_, query) in entry.queries.iter() {
                for &entity in entities {
                    let Ok(committed) = manager.store().old_flag(entity) else {
                        assert!(!query.contains(entity));
                        continue;
                    };
                    assert_eq!(
                        query.contains(entity),
                        flags_match(query.required(), committed),
                        "{} / {entity}",
                        entry.name
                    );
                }
            }
        }
    }

    #[test]
    fn bound_entity_joins_after_first_update() {
        let mut manager = manager_with::<BothSystem>();
        manager.init().unwrap();

        let entity = spawn_ab(&mut manager);
        assert_eq!(manager.store().flag(entity).unwrap().bits(), 0b11);
        assert!(manager.members::<BothSystem>(DEFAULT_SET).is_empty());

        let report = manager.update().unwrap();
        assert_eq!(report.bound, 1);
        assert_eq!(report.joined, 1);
        assert_eq!(manager.members::<BothSystem>(DEFAULT_SET), &[entity]);
        assert_eq!(manager.queries::<BothSystem>().and_then(|q| q.required(DEFAULT_SET)).map(|m| m.bits()), Some(0b11));
        assert_eq!(manager.system::<BothSystem>().map(|s| s.seen.clone()), Some(vec![1]));
    }

    #[test]
    fn unbound_entity_stays_invisible() {
        let mut manager = manager_with::<OnlyASystem>();
        manager.init().unwrap();

        let entity = manager.store_mut().spawn().add_component(A(0)).unwrap().id();
        manager.update().unwrap();
        assert!(manager.members::<OnlyASystem>(DEFAULT_SET).is_empty());

        manager.store_mut().bind(entity).unwrap();
        manager.update().unwrap();
        assert_eq!(manager.members::<OnlyASystem>(DEFAULT_SET), &[entity]);
    }

    #[test]
    fn superset_flags_match_smaller_requirements() {
        let mut manager = SystemManager::new();
        manager.register::<BothSystem>().unwrap();
        manager.register::<OnlyASystem>().unwrap();
        manager.init().unwrap();

        let entity = spawn_ab(&mut manager);
        manager.update().unwrap();
        assert_eq!(manager.members::<BothSystem>(DEFAULT_SET), &[entity]);
        assert_eq!(manager.members::<OnlyASystem>(DEFAULT_SET), &[entity]);
        assert_membership_consistent(&manager, &[entity]);
    }

    #[test]
    fn component_removal_waits_for_reconciliation() {
        let mut manager = manager_with::<BothSystem>();
        manager.init().unwrap();
        let entity = spawn_ab(&mut manager);
        manager.update().unwrap();

        manager.store_mut().remove_component::<B>(entity).unwrap();
        assert_eq!(manager.store().flag(entity).unwrap().bits(), 0b01);
        assert_eq!(manager.store().old_flag(entity).unwrap().bits(), 0b11);
        assert_eq!(manager.members::<BothSystem>(DEFAULT_SET), &[entity]);

        let report = manager.update().unwrap();
        assert_eq!(report.left, 1);
        assert!(manager.members::<BothSystem>(DEFAULT_SET).is_empty());
        assert_eq!(manager.store().old_flag(entity).unwrap().bits(), 0b01);
    }

    #[test]
    fn reconciliation_without_changes_is_a_no_op() {
        let mut manager = SystemManager::new();
        manager.register::<BothSystem>().unwrap();
        manager.register::<SplitSystem>().unwrap();
        manager.init().unwrap();
        let entity = spawn_ab(&mut manager);
        manager.update().unwrap();

        let before: Vec<Vec<Entity>> = manager
            .registry
            .iter()
            .flat_map(|entry| entry.queries.iter().map(|(_, q)| q.entities().to_vec()))
            .collect();

        // Rebinding without structural changes re-runs reconciliation on equal flags.
        manager.store_mut().bind(entity).unwrap();
        let report = manager.update().unwrap();
        assert_eq!(report.bound, 1);
        assert_eq!((report.joined, report.left), (0, 0));

        let after: Vec<Vec<Entity>> = manager
            .registry
            .iter()
            .flat_map(|entry| entry.queries.iter().map(|(_, q)| q.entities().to_vec()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn flag_swap_moves_between_sets_in_one_pass() {
        let mut manager = manager_with::<SplitSystem>();
        manager.init().unwrap();

        let entity = manager.store_mut().spawn().add_component(A(0)).unwrap().bind().unwrap();
        manager.update().unwrap();
        assert_eq!(manager.members::<SplitSystem>(DEFAULT_SET), &[entity]);
        assert!(manager.members::<SplitSystem>(1).is_empty());

        manager.store_mut().remove_component::<A>(entity).unwrap();
        manager.store_mut().add_component(entity, B(0)).unwrap();
        let report = manager.update().unwrap();

        assert_eq!((report.joined, report.left), (1, 1));
        assert!(manager.members::<SplitSystem>(DEFAULT_SET).is_empty());
        assert_eq!(manager.members::<SplitSystem>(1), &[entity]);
    }

    #[test]
    fn duplicate_registration_keeps_one_instance() {
        let mut manager = SystemManager::new();
        let first = manager.register::<BothSystem>().unwrap();
        let second = manager.register::<BothSystem>().unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.system_names(), vec!["BothSystem"]);

        manager.init().unwrap();
        manager.update().unwrap();
        manager.update().unwrap();

        let system = manager.system::<BothSystem>().unwrap();
        assert_eq!(system.inits, 1);
        assert_eq!(system.updates, 2);
    }

    #[test]
    fn despawned_entity_leaves_every_set() {
        let mut manager = SystemManager::new();
        manager.register::<BothSystem>().unwrap();
        manager.register::<OnlyASystem>().unwrap();
        manager.init().unwrap();
        let entity = spawn_ab(&mut manager);
        manager.update().unwrap();

        manager.store_mut().despawn(entity).unwrap();
        assert_eq!(manager.store().state(entity), Ok(EntityState::Despawning));
        // Systems get one last look during the removal cycle.
        let report = manager.update().unwrap();
        assert_eq!(manager.system::<BothSystem>().map(|s| s.seen.clone()), Some(vec![1, 1]));
        assert_eq!(report.removed, 1);
        assert_eq!(report.left, 2);

        assert!(manager.members::<BothSystem>(DEFAULT_SET).is_empty());
        assert!(manager.members::<OnlyASystem>(DEFAULT_SET).is_empty());
        assert!(manager.store().get::<A>(entity).is_none());
        assert!(manager.store().entity(entity).is_err());
        assert!(manager.store().removable_entities().is_empty());
        assert_membership_consistent(&manager, &[entity]);
    }

    #[test]
    fn registration_after_init_is_rejected() {
        let mut manager = manager_with::<BothSystem>();
        manager.init().unwrap();
        assert!(manager.is_live());
        assert!(matches!(
            manager.register::<OnlyASystem>(),
            Err(SystemRegistrationError::ManagerLive { .. })
        ));
        assert!(!manager.has_system::<OnlyASystem>());
    }

    #[test]
    fn lifecycle_errors() {
        let mut manager = manager_with::<BothSystem>();
        assert!(matches!(manager.update(), Err(ManagerError::NotInitialized)));
        manager.init().unwrap();
        assert!(matches!(manager.init(), Err(ManagerError::AlreadyInitialized)));
    }

    #[derive(Default)]
    struct FailingSystem;

    impl System for FailingSystem {
        fn init(&mut self, _init: &mut SystemInit<'_>) -> Result<(), SystemError> {
            Err(SystemError::Custom("missing asset".into()))
        }
    }

    #[test]
    fn failed_init_names_the_system() {
        let mut manager = manager_with::<FailingSystem>();
        match manager.init() {
            Err(ManagerError::SystemInit { system, .. }) => assert_eq!(system, "FailingSystem"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!manager.is_live());
        assert!(matches!(manager.update(), Err(ManagerError::NotInitialized)));
    }

    #[test]
    fn capacity_overflow_fails_init() {
        #[derive(Default)]
        struct ThreeKinds;

        impl System for ThreeKinds {
            fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
                init.require::<A>()?.require::<B>()?.require::<C>()?;
                Ok(())
            }
        }

        let config = ManagerConfig {
            component_capacity: 2,
            ..ManagerConfig::default()
        };
        let mut manager = SystemManager::with_config(config).unwrap();
        manager.register::<ThreeKinds>().unwrap();
        assert!(matches!(
            manager.init(),
            Err(ManagerError::SystemInit {
                source: SystemError::Component(ComponentError::CapacityExceeded { .. }),
                ..
            })
        ));
    }

    /// Spawns one bound entity per update from inside the system.
    #[derive(Default)]
    struct SpawnerSystem {
        spawned: Vec<Entity>,
    }

    impl System for SpawnerSystem {
        fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
            init.require::<A>()?;
            Ok(())
        }

        fn update(&mut self, ctx: &mut SystemContext<'_>) {
            let members = ctx.entities().len();
            if let Ok(view) = ctx.store_mut().spawn().add_component(A(members as i32)) {
                if let Ok(entity) = view.bind() {
                    self.spawned.push(entity);
                }
            }
        }
    }

    #[test]
    fn entities_bound_during_update_join_next_cycle() {
        let mut manager = manager_with::<SpawnerSystem>();
        manager.init().unwrap();

        manager.update().unwrap();
        assert!(manager.members::<SpawnerSystem>(DEFAULT_SET).is_empty());
        assert_eq!(manager.store().bindable_entities().len(), 1);

        manager.update().unwrap();
        let spawned = manager.system::<SpawnerSystem>().unwrap().spawned.clone();
        assert_eq!(manager.members::<SpawnerSystem>(DEFAULT_SET), &spawned[..1]);
        assert_eq!(manager.store().get::<A>(spawned[1]), Some(&A(1)));
    }

    #[test]
    fn reports_and_counters_track_cycles() {
        let mut manager = SystemManager::new();
        manager.register::<BothSystem>().unwrap();
        manager.register::<OnlyASystem>().unwrap();
        manager.init().unwrap();
        spawn_ab(&mut manager);

        let report = manager.update().unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(manager.tick(), 1);
        let names: Vec<&str> = report.systems.iter().map(|run| run.name.as_str()).collect();
        assert_eq!(names, vec!["BothSystem", "OnlyASystem"]);
        assert!(report.systems.iter().all(|run| run.duration_ms >= 0.0));

        if weft_metrics::enabled() {
            assert_eq!(manager.counters().get("cycles"), 1);
            assert_eq!(manager.counters().get("joined"), 2);
            assert_eq!(manager.profiler().calls("BothSystem"), 1);
        }
    }

    /// Re-attaches B on every member each update.
    #[derive(Default)]
    struct TouchSystem;

    impl System for TouchSystem {
        fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
            init.require::<A>()?;
            Ok(())
        }

        fn update(&mut self, ctx: &mut SystemContext<'_>) {
            let entities = ctx.entities();
            let tick = ctx.tick() as i32;
            for &entity in entities {
                let _ = ctx.store_mut().add_component(entity, B(tick));
            }
        }
    }

    #[test]
    fn changes_during_update_queue_each_entity_once() {
        let mut manager = manager_with::<TouchSystem>();
        manager.init().unwrap();
        let entity = manager.store_mut().spawn().add_component(A(0)).unwrap().bind().unwrap();

        for _ in 0..6 {
            let report = manager.update().unwrap();
            assert_eq!(report.bound, 1);
            assert_eq!(manager.store().bindable_entities(), &[entity]);
        }
        assert_eq!(manager.members::<TouchSystem>(DEFAULT_SET), &[entity]);
        assert_eq!(manager.store().get::<B>(entity), Some(&B(6)));
        if weft_metrics::enabled() {
            assert_eq!(manager.counters().get("bound"), 6);
        }
    }

    /// Despawns every member on its first update.
    #[derive(Default)]
    struct CullSystem;

    impl System for CullSystem {
        fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
            init.require::<A>()?;
            Ok(())
        }

        fn update(&mut self, ctx: &mut SystemContext<'_>) {
            let entities = ctx.entities();
            for &entity in entities {
                let _ = ctx.store_mut().despawn(entity);
            }
        }
    }

    #[test]
    fn despawn_during_update_leaves_no_dead_members() {
        let mut manager = SystemManager::new();
        manager.register::<CullSystem>().unwrap();
        manager.register::<OnlyASystem>().unwrap();
        manager.init().unwrap();
        let entity = spawn_ab(&mut manager);

        let report = manager.update().unwrap();
        assert_eq!(report.removed, 1);
        assert!(!manager.store().is_alive(entity));
        assert!(manager.members::<CullSystem>(DEFAULT_SET).is_empty());
        assert!(manager.members::<OnlyASystem>(DEFAULT_SET).is_empty());
        assert_membership_consistent(&manager, &[entity]);
    }
}
