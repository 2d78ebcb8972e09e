//! Demo components and systems driven by the runtime binary.

use glam::Vec3;
use weft_core::define_component;
use weft_core::ecs::{Entity, EntityStore, StoreError, System, SystemContext, SystemError, SystemInit};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(pub Vec3);
define_component!(Position);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity(pub Vec3);
define_component!(Velocity);

/// Cycles left before the entity is despawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    pub remaining: u32,
}
define_component!(Lifetime);

/// Integrates velocity into position once per cycle.
#[derive(Default)]
pub struct MovementSystem {
    moved: u64,
}

impl MovementSystem {
    /// Total entity moves performed so far.
    pub fn moved(&self) -> u64 {
        self.moved
    }
}

impl System for MovementSystem {
    fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
        init.require::<Position>()?.require::<Velocity>()?;
        Ok(())
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        for &entity in ctx.entities() {
            let Some(Velocity(velocity)) = ctx.store().get::<Velocity>(entity).copied() else {
                continue;
            };
            if let Some(Position(position)) = ctx.store_mut().get_mut::<Position>(entity) {
                *position += velocity;
                self.moved += 1;
            }
        }
    }
}

/// Counts down every [`Lifetime`] and despawns entities that reach zero.
#[derive(Default)]
pub struct LifetimeSystem {
    expired: u64,
}

impl LifetimeSystem {
    pub fn expired(&self) -> u64 {
        self.expired
    }
}

impl System for LifetimeSystem {
    fn init(&mut self, init: &mut SystemInit<'_>) -> Result<(), SystemError> {
        init.require::<Lifetime>()?;
        Ok(())
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let entities = ctx.entities();
        let tick = ctx.tick();
        let store = ctx.store_mut();
        for &entity in entities {
            let Some(lifetime) = store.get_mut::<Lifetime>(entity) else {
                continue;
            };
            lifetime.remaining = lifetime.remaining.saturating_sub(1);
            if lifetime.remaining == 0 && store.despawn(entity).is_ok() {
                tracing::debug!(%entity, tick, "lifetime expired");
                self.expired += 1;
            }
        }
    }
}

/// Spawn `count` moving entities, spaced one unit apart along x.
pub fn spawn_movers(store: &mut EntityStore, count: usize, lifetime: Option<u32>) -> Result<Vec<Entity>, StoreError> {
    let mut spawned = Vec::with_capacity(count);
    for i in 0..count {
        let mut view = store
            .spawn()
            .add_component(Position(Vec3::new(10.0 + i as f32, 12.0, 4.0)))?
            .add_component(Velocity(Vec3::new(1.0, 0.0, 0.5)))?;
        if let Some(remaining) = lifetime {
            view = view.add_component(Lifetime { remaining })?;
        }
        spawned.push(view.bind()?);
    }
    Ok(spawned)
}
