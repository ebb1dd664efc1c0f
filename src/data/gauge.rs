use super::atomic::AtomicF64;

/// Tracks the last recorded value.
///
/// Values operate in last-write-wins mode and are not drained by snapshots.
#[derive(Debug)]
pub struct Gauge {
    value: AtomicF64,
}

impl Gauge {
    /// Creates a new gauge holding `v`.
    pub fn new(v: f64) -> Gauge {
        Gauge {
            value: AtomicF64::new(v),
        }
    }

    /// Stores `v` as the current value.
    pub fn update(&self, v: f64) { self.value.store(v); }

    /// Returns the current value.
    pub fn snapshot(&self) -> f64 { self.value.load() }
}
