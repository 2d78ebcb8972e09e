//! Wall-clock timing of whole update cycles

use super::rolling_window::RollingWindow;
use std::time::{Duration, Instant};

pub struct CycleTimer {
    cycle_start: Instant,
    cycle_times: RollingWindow<Duration>,
    cycles: u64,
}

impl CycleTimer {
    pub fn new(window: usize) -> Self {
        Self {
            cycle_start: Instant::now(),
            cycle_times: RollingWindow::new(window),
            cycles: 0,
        }
    }

    pub fn begin(&mut self) {
        self.cycle_start = Instant::now();
    }

    pub fn end(&mut self) {
        self.cycle_times.push(self.cycle_start.elapsed());
        self.cycles += 1;
    }

    /// Cycles completed since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cycles_per_second(&self) -> f64 {
        let avg = self.cycle_times.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn cycle_time_ms(&self) -> f64 {
        self.cycle_times.average().as_secs_f64() * 1000.0
    }

    pub fn cycle_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.cycle_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
