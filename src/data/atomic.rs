use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free `f64` cell.
///
/// The value lives as its IEEE-754 bit pattern inside an `AtomicU64`; loads,
/// stores and swaps map directly onto the integer atomics, and additions loop
/// on a compare-exchange of the bits.
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(v: f64) -> AtomicF64 { AtomicF64(AtomicU64::new(v.to_bits())) }

    pub fn load(&self) -> f64 { f64::from_bits(self.0.load(Ordering::SeqCst)) }

    pub fn store(&self, v: f64) { self.0.store(v.to_bits(), Ordering::SeqCst); }

    /// Stores `v` and returns the previous value.
    pub fn swap(&self, v: f64) -> f64 { f64::from_bits(self.0.swap(v.to_bits(), Ordering::SeqCst)) }

    /// Adds `delta` and returns the new value.
    pub fn add(&self, delta: f64) -> f64 {
        let mut old = self.0.load(Ordering::SeqCst);
        loop {
            let new = (f64::from_bits(old) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(old, new, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return f64::from_bits(new),
                Err(current) => old = current,
            }
        }
    }
}

impl fmt::Debug for AtomicF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.load()) }
}

#[cfg(test)]
mod tests {
    use super::AtomicF64;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_load_store_swap() {
        let v = AtomicF64::new(1.5);
        assert_eq!(v.load(), 1.5);

        v.store(-3.25);
        assert_eq!(v.load(), -3.25);

        assert_eq!(v.swap(7.0), -3.25);
        assert_eq!(v.load(), 7.0);
    }

    #[test]
    fn test_add() {
        let v = AtomicF64::new(0.0);
        assert_eq!(v.add(2.5), 2.5);
        assert_eq!(v.add(-0.5), 2.0);
        assert_eq!(v.load(), 2.0);
    }

    #[test]
    fn test_concurrent_add() {
        let v = Arc::new(AtomicF64::new(0.0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let v = v.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    v.add(1.0);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(v.load(), 4000.0);
    }
}
