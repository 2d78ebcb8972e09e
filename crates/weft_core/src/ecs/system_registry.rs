use crate::ecs::{QuerySets, System, SystemHandle};
use std::any::TypeId;
use std::collections::HashMap;

/// Owns one instance per concrete system type, in registration order.
pub(crate) struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    type_lookup: HashMap<TypeId, SystemHandle>,
}

pub(crate) struct RegisteredSystem {
    pub handle: SystemHandle,
    pub name: String,
    pub system: Box<dyn System>,
    pub queries: QuerySets,
}

/// Outcome of [`SystemRegistry::register`].
pub(crate) enum Registration {
    Added(SystemHandle),
    Existing(SystemHandle),
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            type_lookup: HashMap::new(),
        }
    }

    /// Store `system` unless an instance of `S` is already present.
    pub fn register<S: System>(&mut self, system: S) -> Registration {
        let type_id = TypeId::of::<S>();
        if let Some(handle) = self.type_lookup.get(&type_id) {
            return Registration::Existing(*handle);
        }

        let handle = SystemHandle::new(self.systems.len() as u32);
        self.type_lookup.insert(type_id, handle);
        self.systems.push(RegisteredSystem {
            handle,
            name: short_system_name(std::any::type_name::<S>()),
            system: Box::new(system),
            queries: QuerySets::default(),
        });
        Registration::Added(handle)
    }

    pub fn handle_of<S: System>(&self) -> Option<SystemHandle> {
        self.type_lookup.get(&TypeId::of::<S>()).copied()
    }

    pub fn entry(&self, handle: SystemHandle) -> Option<&RegisteredSystem> {
        self.systems.get(handle.index() as usize)
    }

    pub fn entry_of<S: System>(&self) -> Option<&RegisteredSystem> {
        self.handle_of::<S>().and_then(|handle| self.entry(handle))
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        let entry = self.entry_of::<S>()?;
        let system: &dyn System = entry.system.as_ref();
        system.as_any().downcast_ref::<S>()
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        let handle = self.handle_of::<S>()?;
        let entry = self.systems.get_mut(handle.index() as usize)?;
        let system: &mut dyn System = entry.system.as_mut();
        system.as_any_mut().downcast_mut::<S>()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredSystem> {
        self.systems.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegisteredSystem> {
        self.systems.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }
}

/// `my_crate::systems::MovementSystem<Foo>` -> `MovementSystem`
pub(crate) fn short_system_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
