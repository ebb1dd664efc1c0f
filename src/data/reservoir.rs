use super::distribution::{self, Distribution};
use parking_lot::Mutex;
use quanta::Clock;
use std::time::Duration;

/// Default histogram bin capacity for reservoirs and timers.
const DEFAULT_SIZE: usize = 20;

/// Samples observed values into a bounded streaming histogram.
///
/// Unlike a random sampler, every observation lands in the sketch; memory
/// stays bounded by the configured bin capacity.
#[derive(Debug)]
pub struct Reservoir {
    hist: Mutex<Distribution>,
}

impl Reservoir {
    /// Creates a reservoir with the default bin capacity.
    pub fn new() -> Reservoir { Reservoir::with_size(DEFAULT_SIZE) }

    /// Creates a reservoir with a custom bin capacity. A size of zero falls
    /// back to the default.
    pub fn with_size(size: usize) -> Reservoir {
        let size = if size == 0 { DEFAULT_SIZE } else { size };
        Reservoir {
            hist: Mutex::new(Distribution::new(size)),
        }
    }

    /// Records an observation.
    pub fn update(&self, v: f64) { self.hist.lock().add(v); }

    /// Returns an independent copy of the accumulated distribution.
    pub fn snapshot(&self) -> Distribution {
        let hist = self.hist.lock();
        distribution::acquire_copy(&hist)
    }
}

impl Default for Reservoir {
    fn default() -> Reservoir { Reservoir::new() }
}

/// Records durations, in milliseconds with sub-millisecond precision.
pub struct Timer {
    reservoir: Reservoir,
    clock: Clock,
}

impl Timer {
    /// Creates a timer with the default bin capacity.
    pub fn new() -> Timer { Timer::with_size(DEFAULT_SIZE) }

    /// Creates a timer with a custom bin capacity.
    pub fn with_size(size: usize) -> Timer {
        Timer {
            reservoir: Reservoir::with_size(size),
            clock: Clock::new(),
        }
    }

    /// Records a duration.
    pub fn update(&self, d: Duration) { self.reservoir.update(d.as_secs_f64() * 1000.0); }

    /// Returns a start token for [`Timer::since`].
    pub fn start(&self) -> u64 { self.clock.now() }

    /// Records the time elapsed since `start`.
    pub fn since(&self, start: u64) {
        self.record_ns(self.clock.now().saturating_sub(start));
    }

    /// Measures and records the execution time of `f`, passing its result
    /// through.
    pub fn time<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = self.clock.now();
        let ret = f();
        self.record_ns(self.clock.now().saturating_sub(start));
        ret
    }

    /// Returns an independent copy of the accumulated durations.
    pub fn snapshot(&self) -> Distribution { self.reservoir.snapshot() }

    fn record_ns(&self, ns: u64) { self.reservoir.update(ns as f64 / 1e6); }
}

impl Default for Timer {
    fn default() -> Timer { Timer::new() }
}
