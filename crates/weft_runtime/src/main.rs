//! Weft Runtime
//!
//! Small host binary: loads settings, registers the demo systems, spawns
//! moving entities and drives the update loop.
//!
//! Usage: `weft [settings.json]`

mod settings;
mod systems;

use anyhow::Result;
use settings::RuntimeSettings;
use std::path::PathBuf;
use systems::{LifetimeSystem, MovementSystem, Position};
use weft_core::ecs::SystemManager;
use weft_metrics::CycleTimer;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Weft v{}", weft_core::VERSION);

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = RuntimeSettings::load(path.as_deref())?;
    tracing::debug!(?settings, "settings loaded");

    let mut manager = SystemManager::with_config(settings.manager.clone())?;
    manager.register::<MovementSystem>()?;
    manager.register::<LifetimeSystem>()?;
    manager.init()?;

    let spawned = systems::spawn_movers(manager.store_mut(), settings.entities, settings.despawn_after)?;
    tracing::info!(entities = spawned.len(), systems = ?manager.system_names(), "runtime initialized");

    let mut timer = CycleTimer::new(60);
    for _ in 0..settings.ticks {
        timer.begin();
        let report = manager.update()?;
        timer.end();

        if settings.log_every > 0 && report.tick % settings.log_every == 0 {
            for entity in &spawned {
                match manager.store().get::<Position>(*entity) {
                    Some(Position(position)) => {
                        tracing::info!(tick = report.tick, %entity, x = position.x, y = position.y, z = position.z, "position");
                    }
                    None => tracing::info!(tick = report.tick, %entity, "despawned"),
                }
            }
            tracing::debug!(
                tick = report.tick,
                bound = report.bound,
                removed = report.removed,
                joined = report.joined,
                left = report.left,
                "cycle"
            );
        }
    }

    let (min_ms, max_ms) = timer.cycle_time_range_ms();
    tracing::info!(
        cycles = timer.cycles(),
        avg_ms = timer.cycle_time_ms(),
        min_ms,
        max_ms,
        live = manager.store().len(),
        "run complete"
    );
    for (name, timing) in manager.profiler().iter() {
        tracing::info!(system = %name, calls = timing.calls, total_ms = timing.total.as_secs_f64() * 1000.0, "system timing");
    }
    for (name, value) in manager.counters().iter() {
        tracing::info!(counter = name, value, "counter");
    }
    if let Some(movement) = manager.system::<MovementSystem>() {
        tracing::info!(moved = movement.moved(), "movement summary");
    }
    if let Some(lifetime) = manager.system::<LifetimeSystem>() {
        tracing::info!(expired = lifetime.expired(), "lifetime summary");
    }

    Ok(())
}
