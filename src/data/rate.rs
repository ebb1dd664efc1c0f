use super::atomic::AtomicF64;
use super::counter::Counter;
use quanta::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Tracks the rate of values per unit of time.
///
/// The unit defaults to one second. A snapshot reads the accumulated total
/// and the time elapsed since the previous snapshot, then resets both.
pub struct Rate {
    time: AtomicU64,
    unit: f64,
    count: Counter,
    clock: Clock,
}

impl Rate {
    /// Creates a rate reported per second.
    pub fn new() -> Rate { Rate::with_unit(Duration::from_secs(1)) }

    /// Creates a rate reported per `unit`, e.g. per minute.
    pub fn with_unit(unit: Duration) -> Rate {
        let clock = Clock::new();
        Rate {
            time: AtomicU64::new(clock.now()),
            unit: unit.as_nanos() as f64,
            count: Counter::new(),
            clock,
        }
    }

    /// Adds `v` to the accumulated total.
    pub fn update(&self, v: f64) { self.count.update(v); }

    /// Returns the rate of values per unit since the last snapshot and
    /// resets the accumulator. Yields 0 when nothing was recorded.
    pub fn snapshot(&self) -> f64 {
        let now = self.clock.now();
        let prev = self.time.swap(now, Ordering::SeqCst);
        let count = self.count.snapshot();

        let elapsed = now.saturating_sub(prev);
        if count == 0.0 || elapsed == 0 {
            return 0.0;
        }
        count / elapsed as f64 * self.unit
    }
}

impl Default for Rate {
    fn default() -> Rate { Rate::new() }
}

/// Tracks the rate of deltas between consecutive observations.
///
/// Useful for monotonically growing counters maintained elsewhere: each
/// update feeds the difference with the previously observed value into an
/// embedded [`Rate`].
pub struct Derive {
    rate: Rate,
    value: AtomicF64,
}

impl Derive {
    /// Creates a derive starting from the observed value `v`.
    pub fn new(v: f64) -> Derive {
        Derive {
            rate: Rate::new(),
            value: AtomicF64::new(v),
        }
    }

    /// Creates a derive reported per `unit`.
    pub fn with_unit(v: f64, unit: Duration) -> Derive {
        Derive {
            rate: Rate::with_unit(unit),
            value: AtomicF64::new(v),
        }
    }

    /// Records a new observed value; the delta with the previous observation
    /// feeds the rate.
    pub fn update(&self, v: f64) {
        let prev = self.value.swap(v);
        self.rate.update(v - prev);
    }

    /// Returns the rate of deltas per unit since the last snapshot.
    pub fn snapshot(&self) -> f64 { self.rate.snapshot() }
}
