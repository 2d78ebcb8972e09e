//! Fixed-size window of recent samples

use std::time::Duration;

pub struct RollingWindow<T> {
    samples: Vec<T>,
    capacity: usize,
    cursor: usize,
}

impl<T: Copy> RollingWindow<T> {
    /// A zero capacity is bumped to one so `push` always has a slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    pub fn push(&mut self, sample: T) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.cursor = 0;
    }
}

impl RollingWindow<Duration> {
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn min_max(&self) -> (Duration, Duration) {
        let mut iter = self.samples.iter().copied();
        let Some(first) = iter.next() else {
            return (Duration::ZERO, Duration::ZERO);
        };
        iter.fold((first, first), |(min, max), sample| {
            (min.min(sample), max.max(sample))
        })
    }
}
