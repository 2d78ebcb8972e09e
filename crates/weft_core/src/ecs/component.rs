// component.rs - Component kinds, id registry and bitmask flags
//
// Components are identified by dense u32 ids handed out by a registry
// instance on first use. Each id owns one bit of a 64-bit mask, which is
// what entities carry and what query sets require.

use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::mem::{align_of, size_of};
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

pub type ComponentId = u32;

/// Number of distinct component kinds a mask can describe.
pub const MAX_COMPONENTS: usize = u64::BITS as usize;

/// Trait for component kinds attached to entities.
///
/// Components carry no identity; at runtime they are known only by the id
/// their registry assigns them.
pub trait Component: 'static + Send + Sync {
    /// Human-readable name for debugging.
    const NAME: &'static str;
}

/// Helper macro to implement the Component trait.
///
/// # Example
/// ```ignore
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position);
/// define_component!(Velocity, "Velocity");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty) => {
        $crate::define_component!($ty, stringify!($ty));
    };
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
}

/// Set of component ids packed into a single word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Mask with only `id` set. Ids past the mask width yield an empty mask;
    /// the registry never hands those out.
    #[inline]
    pub const fn from_id(id: ComponentId) -> Self {
        if (id as usize) < MAX_COMPONENTS {
            Self(1 << id)
        } else {
            Self::EMPTY
        }
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn with(self, id: ComponentId) -> Self {
        Self(self.0 | Self::from_id(id).0)
    }

    #[inline]
    pub const fn without(self, id: ComponentId) -> Self {
        Self(self.0 & !Self::from_id(id).0)
    }

    #[inline]
    pub const fn has(self, id: ComponentId) -> bool {
        self.0 & Self::from_id(id).0 != 0
    }

    /// Whether every bit of `required` is present in `self`.
    #[inline]
    pub const fn contains(self, required: Self) -> bool {
        flags_match(required, self)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Component ids in ascending order.
    pub fn ids(self) -> impl Iterator<Item = ComponentId> {
        let mut remaining = self.0;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let id = remaining.trailing_zeros();
            remaining &= remaining - 1;
            Some(id)
        })
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

/// `actual` carries every component `required` asks for.
#[inline]
pub const fn flags_match(required: ComponentMask, actual: ComponentMask) -> bool {
    required.0 & actual.0 == required.0
}

/// Metadata describing a registered component kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("cannot register component '{name}': registry capacity of {capacity} kinds exhausted")]
    CapacityExceeded { name: &'static str, capacity: usize },

    #[error("component capacity {requested} is outside 1..=64")]
    InvalidCapacity { requested: usize },
}

#[derive(Default)]
struct RegistryInner {
    ids: HashMap<TypeId, ComponentId>,
    metas: Vec<ComponentMeta>,
}

/// Registry mapping component kinds to dense ids.
///
/// Cloning yields another handle onto the same table, so an entity store and
/// a system manager built from the same registry agree on every bit.
#[derive(Clone)]
pub struct ComponentRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    capacity: usize,
}

impl ComponentRegistry {
    /// Registry accepting up to [`MAX_COMPONENTS`] kinds.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner::default())),
            capacity: MAX_COMPONENTS,
        }
    }

    /// Registry accepting at most `capacity` kinds.
    pub fn with_capacity(capacity: usize) -> Result<Self, ComponentError> {
        if capacity == 0 || capacity > MAX_COMPONENTS {
            return Err(ComponentError::InvalidCapacity {
                requested: capacity,
            });
        }
        Ok(Self {
            capacity,
            ..Self::new()
        })
    }

    /// Id for `K`, allocating the next free id on first use.
    pub fn id_of<K: Component>(&self) -> Result<ComponentId, ComponentError> {
        if let Some(id) = self.lookup::<K>() {
            return Ok(id);
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another handle may have registered K between the read and write locks.
        if let Some(&id) = inner.ids.get(&TypeId::of::<K>()) {
            return Ok(id);
        }
        if inner.metas.len() >= self.capacity {
            return Err(ComponentError::CapacityExceeded {
                name: K::NAME,
                capacity: self.capacity,
            });
        }

        let id = inner.metas.len() as ComponentId;
        inner.ids.insert(TypeId::of::<K>(), id);
        inner.metas.push(ComponentMeta {
            id,
            name: K::NAME,
            size: size_of::<K>(),
            align: align_of::<K>(),
        });
        tracing::debug!(component = K::NAME, id, "registered component kind");
        Ok(id)
    }

    /// Id for `K` if it has been registered, without allocating.
    pub fn lookup<K: Component>(&self) -> Option<ComponentId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(&TypeId::of::<K>())
            .copied()
    }

    /// Single-bit mask for `K`, registering it if needed.
    pub fn mask_of<K: Component>(&self) -> Result<ComponentMask, ComponentError> {
        self.id_of::<K>().map(ComponentMask::from_id)
    }

    pub fn meta_of(&self, id: ComponentId) -> Option<ComponentMeta> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .metas
            .get(id as usize)
            .cloned()
    }

    /// Names of the kinds present in `mask`, for diagnostics.
    pub fn describe(&self, mask: ComponentMask) -> Vec<&'static str> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        mask.ids()
            .filter_map(|id| inner.metas.get(id as usize).map(|meta| meta.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .metas
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget every registered kind. Ids restart at zero.
    ///
    /// Only meaningful between independent runs (tests); masks computed
    /// before the reset refer to ids that may be reassigned.
    pub fn reset(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.ids.clear();
        inner.metas.clear();
    }

    /// Whether `other` is a handle onto the same table.
    pub fn same_as(&self, other: &ComponentRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    define_component!(Position);

    struct Velocity;
    define_component!(Velocity);

    struct Health;
    define_component!(Health, "Health");

    #[test]
    fn ids_are_dense_and_stable() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.id_of::<Position>(), Ok(0));
        assert_eq!(registry.id_of::<Velocity>(), Ok(1));
        assert_eq!(registry.id_of::<Position>(), Ok(0));
        assert_eq!(registry.len(), 2);

        let meta = registry.meta_of(1).expect("velocity registered");
        assert_eq!(meta.name, "Velocity");
        assert_eq!(meta.size, 0);
    }

    #[test]
    fn lookup_does_not_allocate() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.lookup::<Health>(), None);
        assert!(registry.is_empty());
        registry.id_of::<Health>().unwrap();
        assert_eq!(registry.lookup::<Health>(), Some(0));
    }

    #[test]
    fn clones_share_one_table() {
        let registry = ComponentRegistry::new();
        let other = registry.clone();
        other.id_of::<Velocity>().unwrap();
        assert_eq!(registry.lookup::<Velocity>(), Some(0));
        assert!(registry.same_as(&other));
        assert!(!registry.same_as(&ComponentRegistry::new()));
    }

    #[test]
    fn capacity_overflow_is_reported() {
        let registry = ComponentRegistry::with_capacity(2).unwrap();
        registry.id_of::<Position>().unwrap();
        registry.id_of::<Velocity>().unwrap();
        assert_eq!(
            registry.id_of::<Health>(),
            Err(ComponentError::CapacityExceeded {
                name: "Health",
                capacity: 2
            })
        );
        // Existing kinds still resolve.
        assert_eq!(registry.id_of::<Velocity>(), Ok(1));
    }

    #[test]
    fn invalid_capacity_is_rejected() {
        assert!(ComponentRegistry::with_capacity(0).is_err());
        assert!(ComponentRegistry::with_capacity(MAX_COMPONENTS + 1).is_err());
        assert!(ComponentRegistry::with_capacity(MAX_COMPONENTS).is_ok());
    }

    #[test]
    fn reset_restarts_ids() {
        let registry = ComponentRegistry::new();
        registry.id_of::<Position>().unwrap();
        registry.id_of::<Velocity>().unwrap();
        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.id_of::<Velocity>(), Ok(0));
    }

    #[test]
    fn flags_match_is_superset_test() {
        let a = ComponentMask::from_id(0);
        let ab = a.with(1);
        assert!(flags_match(a, ab));
        assert!(flags_match(ab, ab));
        assert!(!flags_match(ab, a));
        assert!(flags_match(ComponentMask::EMPTY, a));
        assert_eq!(ab.bits(), 0b11);
        assert!(ab.contains(a));
    }

    #[test]
    fn mask_bit_operations() {
        let mask = ComponentMask::EMPTY.with(3).with(5).with(63);
        assert!(mask.has(5));
        assert!(!mask.has(4));
        assert_eq!(mask.count(), 3);
        assert_eq!(mask.ids().collect::<Vec<_>>(), vec![3, 5, 63]);
        assert_eq!(mask.without(5).ids().collect::<Vec<_>>(), vec![3, 63]);
        assert_eq!(ComponentMask::from_id(64), ComponentMask::EMPTY);
        assert!(!mask.has(64));
        assert_eq!(format!("{}", ComponentMask::from_bits(0b101)), "0b101");
    }

    #[test]
    fn describe_lists_names() {
        let registry = ComponentRegistry::new();
        let mask = registry.mask_of::<Position>().unwrap() | registry.mask_of::<Health>().unwrap();
        assert_eq!(registry.describe(mask), vec!["Position", "Health"]);
    }
}
