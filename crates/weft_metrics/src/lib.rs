//! Weft Metrics - timing and counting for the binding engine
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use weft_metrics::CycleTimer;
//!
//! let mut timer = CycleTimer::new(60); // Track last 60 cycles
//! timer.begin();
//! // ... run one update cycle ...
//! timer.end();
//! println!("cycle: {:.3} ms", timer.cycle_time_ms());
//! ```
//!
//! Without the `metrics` feature every type below is a no-op stub with the
//! same surface, so callers never need their own `cfg` guards.

use std::time::Duration;

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod cycle_timer;
#[cfg(feature = "metrics")]
mod rolling_window;
#[cfg(feature = "metrics")]
mod system_profiler;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use cycle_timer::CycleTimer;
#[cfg(feature = "metrics")]
pub use rolling_window::RollingWindow;
#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;

/// Accumulated timing for one named system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemTiming {
    pub last: Duration,
    pub total: Duration,
    pub calls: u64,
}

/// Whether this build collects real measurements.
pub const fn enabled() -> bool {
    cfg!(feature = "metrics")
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct CycleTimer;

#[cfg(not(feature = "metrics"))]
impl CycleTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn cycles(&self) -> u64 { 0 }
    pub fn cycles_per_second(&self) -> f64 { 0.0 }
    pub fn cycle_time_ms(&self) -> f64 { 0.0 }
    pub fn cycle_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
}

#[cfg(not(feature = "metrics"))]
pub struct RollingWindow<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RollingWindow<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _sample: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
    pub fn clear(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
impl Default for Counter {
    fn default() -> Self { Self }
}

#[cfg(not(feature = "metrics"))]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn last_timing(&self, _name: &str) -> Duration { Duration::ZERO }
    pub fn get_timing(&self, _name: &str) -> Duration { Duration::ZERO }
    pub fn calls(&self, _name: &str) -> u64 { 0 }
    pub fn reset(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SystemTiming)> { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
impl Default for SystemProfiler {
    fn default() -> Self { Self }
}
