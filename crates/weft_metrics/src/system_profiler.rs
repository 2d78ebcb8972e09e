//! Per-system timing across update cycles

use crate::SystemTiming;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct SystemProfiler {
    timings: HashMap<String, SystemTiming>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
        }
    }

    /// Run `f`, charging its wall time to `name`.
    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let timing = self.timings.entry(name.to_string()).or_default();
        timing.last = elapsed;
        timing.total += elapsed;
        timing.calls += 1;
        result
    }

    /// Duration of the most recent call for `name`.
    pub fn last_timing(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|timing| timing.last)
            .unwrap_or(Duration::ZERO)
    }

    pub fn get_timing(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|timing| timing.total)
            .unwrap_or(Duration::ZERO)
    }

    pub fn calls(&self, name: &str) -> u64 {
        self.timings.get(name).map(|timing| timing.calls).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SystemTiming)> {
        self.timings.iter()
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new()
    }
}
