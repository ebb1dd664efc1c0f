use super::atomic::AtomicF64;

/// A counter that can be incremented or decremented.
///
/// Updates are lock-free; a snapshot drains the accumulated total, so each
/// reporting window only ever sees the values recorded during that window.
#[derive(Debug)]
pub struct Counter {
    count: AtomicF64,
}

impl Counter {
    /// Creates a new counter starting at zero.
    pub fn new() -> Counter {
        Counter {
            count: AtomicF64::new(0.0),
        }
    }

    /// Adds `v` to the counter. Negative deltas decrease it.
    pub fn update(&self, v: f64) { self.count.add(v); }

    /// Returns the accumulated value and resets the counter to zero.
    pub fn snapshot(&self) -> f64 { self.count.swap(0.0) }
}

impl Default for Counter {
    fn default() -> Counter { Counter::new() }
}

#[cfg(test)]
mod tests {
    use super::Counter;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counter_accumulates_and_drains() {
        let counter = Counter::new();
        counter.update(20.0);
        counter.update(25.0);

        assert_eq!(counter.snapshot(), 45.0);
        assert_eq!(counter.snapshot(), 0.0);
    }

    #[test]
    fn test_counter_negative_deltas() {
        let counter = Counter::new();
        counter.update(10.0);
        counter.update(-4.0);

        assert_eq!(counter.snapshot(), 6.0);
    }

    #[test]
    fn test_counter_concurrent_updates() {
        let counter = Arc::new(Counter::new());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    counter.update(1.0);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.snapshot(), 4000.0);
        assert_eq!(counter.snapshot(), 0.0);
    }
}
