use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single histogram bin.
///
/// A bin with a positive weight is exact: it represents a single observed
/// value. A negative weight marks a bin produced by merging neighbours; the
/// sign only matters for quantile interpolation, every other aggregate works
/// on the absolute weight.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bin {
    w: f64,
    v: f64,
}

impl Bin {
    fn sum(&self) -> f64 { self.w.abs() * self.v }
}

/// A bounded-memory summary of observed values.
///
/// The sketch follows Ben-Haim and Yom-Tov, "A Streaming Parallel Decision
/// Tree Algorithm": bins are kept sorted by value, and once their number
/// exceeds the configured capacity the two closest neighbours are merged
/// into a weighted centroid. Insertion is O(capacity), as are all reads.
#[derive(Debug, Clone)]
pub struct Distribution {
    bins: Vec<Bin>,
    size: usize,
    count: u64,
    min: f64,
    max: f64,
}

impl Distribution {
    /// Creates an empty distribution with the given bin capacity.
    pub fn new(size: usize) -> Distribution {
        let size = size.max(1);
        Distribution {
            bins: Vec::with_capacity(size + 1),
            size,
            count: 0,
            min: 0.0,
            max: 0.0,
        }
    }

    /// Clears all state and adopts a new bin capacity.
    pub(crate) fn reset(&mut self, size: usize) {
        let size = size.max(1);
        self.bins.clear();
        self.bins.reserve(size + 1);
        self.size = size;
        self.count = 0;
        self.min = 0.0;
        self.max = 0.0;
    }

    fn copy_from(&mut self, other: &Distribution) {
        self.reset(other.size);
        self.bins.extend_from_slice(&other.bins);
        self.count = other.count;
        self.min = other.min;
        self.max = other.max;
    }

    /// Records a new observation.
    pub fn add(&mut self, v: f64) {
        if self.count == 0 || v < self.min {
            self.min = v;
        }
        if self.count == 0 || v > self.max {
            self.max = v;
        }

        self.insert(v);
        self.count += 1;

        self.prune();
    }

    /// Number of observations.
    pub fn count(&self) -> u64 { self.count }

    /// Smallest observed value, 0 when empty.
    pub fn min(&self) -> f64 { self.min }

    /// Largest observed value, 0 when empty.
    pub fn max(&self) -> f64 { self.max }

    /// Sum of all observed values.
    pub fn sum(&self) -> f64 { self.bins.iter().map(Bin::sum).sum() }

    /// Mean of all observed values, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum() / self.count as f64
    }

    /// Variance of the observed values, 0 when empty.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }

        let mean = self.mean();
        let vv: f64 = self
            .bins
            .iter()
            .map(|b| (mean - b.v) * (mean - b.v) * b.w)
            .sum();
        vv / self.count as f64
    }

    /// Returns the estimated value at quantile `q`.
    ///
    /// Returns 0 for an empty distribution and for `q` outside `[0, 1]`.
    /// `quantile(0.0)` is the minimum and `quantile(1.0)` the maximum.
    pub fn quantile(&self, q: f64) -> f64 {
        if self.count == 0 || !(0.0..=1.0).contains(&q) {
            return 0.0;
        }
        if q == 0.0 {
            return self.min;
        }
        if q == 1.0 {
            return self.max;
        }

        let mut delta = q * self.count as f64;
        let mut pos = 0;
        let mut w0 = 0.0;
        while pos < self.bins.len() {
            let w1 = self.bins[pos].w.abs() / 2.0;
            if delta - w1 - w0 < 0.0 {
                break;
            }
            delta -= w1 + w0;
            w0 = w1;
            pos += 1;
        }

        if pos == 0 {
            resolve(Bin { w: 0.0, v: self.min }, self.bins[0], delta)
        } else if pos == self.bins.len() {
            resolve(self.bins[pos - 1], Bin { w: 0.0, v: self.max }, delta)
        } else {
            resolve(self.bins[pos - 1], self.bins[pos], delta)
        }
    }

    fn insert(&mut self, v: f64) {
        let pos = self.bins.partition_point(|b| b.v < v);

        if let Some(bin) = self.bins.get_mut(pos) {
            if bin.v == v && bin.w > 0.0 {
                bin.w += 1.0;
                return;
            }
        }
        self.bins.insert(pos, Bin { w: 1.0, v });
    }

    fn prune(&mut self) {
        if self.bins.len() <= self.size {
            return;
        }

        let mut pos = 0;
        let mut delta = f64::MAX;
        for i in 0..self.bins.len() - 1 {
            let gap = self.bins[i + 1].v - self.bins[i].v;
            if gap < delta {
                pos = i;
                delta = gap;
            }
        }

        let b1 = self.bins[pos];
        let b2 = self.bins[pos + 1];
        let w = b1.w.abs() + b2.w.abs();
        let v = (b1.sum() + b2.sum()) / w;
        // negative weight marks the merged bin
        self.bins[pos] = Bin { w: -w, v };
        self.bins.remove(pos + 1);
    }
}

/// Interpolates between two neighbouring bins at cumulative offset `delta`.
fn resolve(b1: Bin, b2: Bin, delta: f64) -> f64 {
    // no interpolation across two exact (unmerged) bins
    if b1.w > 0.0 && b2.w > 0.0 {
        return b2.v;
    }

    let w1 = b1.w.abs();
    let w2 = b2.w.abs();

    let z = if w1 == w2 {
        delta / w1
    } else {
        let a = 2.0 * (w2 - w1);
        let b = 2.0 * w1;
        ((b * b + 4.0 * a * delta).sqrt() - b) / a
    };
    b1.v + (b2.v - b1.v) * z
}

impl Serialize for Distribution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(8))?;
        map.serialize_entry("count", &self.count)?;
        map.serialize_entry("min", &self.min)?;
        map.serialize_entry("max", &self.max)?;
        map.serialize_entry("mean", &self.mean())?;
        map.serialize_entry("p50", &self.quantile(0.5))?;
        map.serialize_entry("p90", &self.quantile(0.9))?;
        map.serialize_entry("p99", &self.quantile(0.99))?;
        map.serialize_entry("p999", &self.quantile(0.999))?;
        map.end()
    }
}

// Snapshots allocate one distribution per sample instrument per flush cycle;
// drained copies come back here so steady-state flushing stays allocation
// free. Correctness never depends on a pool hit.
const POOL_LIMIT: usize = 64;

static POOL: Mutex<Vec<Distribution>> = Mutex::new(Vec::new());

/// Returns a pooled deep copy of `src`.
pub(crate) fn acquire_copy(src: &Distribution) -> Distribution {
    let mut copy = match POOL.lock().pop() {
        Some(recycled) => recycled,
        None => Distribution::new(src.size),
    };
    copy.copy_from(src);
    copy
}

/// Hands a drained snapshot back to the pool.
pub(crate) fn release(dist: Distribution) {
    let mut pool = POOL.lock();
    if pool.len() < POOL_LIMIT {
        pool.push(dist);
    }
}

#[cfg(test)]
mod tests {
    use super::{acquire_copy, release, Bin, Distribution};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    fn hist(values: &[f64]) -> Distribution {
        let mut dist = Distribution::new(4);
        for &v in values {
            dist.add(v);
        }
        dist
    }

    fn std_hist() -> Distribution {
        hist(&[39.0, 15.0, 43.0, 7.0, 43.0, 36.0, 47.0, 6.0, 40.0, 49.0, 41.0])
    }

    #[test]
    fn test_add_merges_closest_bins() {
        let dist = std_hist();

        assert_eq!(dist.count(), 11);
        assert_eq!(dist.min(), 6.0);
        assert_eq!(dist.max(), 49.0);
        assert_eq!(
            dist.bins,
            vec![
                Bin { w: -2.0, v: 6.5 },
                Bin { w: 1.0, v: 15.0 },
                Bin { w: -4.0, v: 39.0 },
                Bin { w: -4.0, v: 45.5 },
            ]
        );
    }

    #[test]
    fn test_weights_account_for_every_observation() {
        let dist = std_hist();
        let total: f64 = dist.bins.iter().map(|b| b.w.abs()).sum();
        assert_eq!(total, dist.count() as f64);
    }

    #[test]
    fn test_quantile_table() {
        let blank = Distribution::new(4);
        assert_eq!(blank.quantile(0.95), 0.0);

        let dist = std_hist();
        for (q, want) in [
            (0.0, 6.0),
            (0.25, 19.6),
            (0.5, 39.8),
            (0.75, 44.3),
            (0.95, 47.2),
            (1.0, 49.0),
        ] {
            let got = dist.quantile(q);
            assert!(
                (got - want).abs() < 0.1,
                "quantile({}) = {}, want {}",
                q,
                got,
                want
            );
        }

        // out-of-range input
        assert_eq!(dist.quantile(-1.0), 0.0);
        assert_eq!(dist.quantile(1.1), 0.0);
    }

    #[test]
    fn test_quantile_monotonic_and_bounded() {
        let dist = std_hist();

        let mut prev = dist.min();
        for i in 0..=20 {
            let q = i as f64 / 20.0;
            let v = dist.quantile(q);
            assert!(v >= dist.min() && v <= dist.max(), "quantile({}) = {}", q, v);
            assert!(v >= prev, "quantile not monotonic at {}", q);
            prev = v;
        }
    }

    #[test]
    fn test_quantile_accuracy_on_normal_draws() {
        const N: usize = 10_000;
        const QUANTILES: &[f64] = &[
            0.0001, 0.001, 0.01, 0.1, 0.25, 0.35, 0.65, 0.75, 0.9, 0.99, 0.999, 0.9999,
        ];

        for seed in 0..3u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut sketch = Distribution::new(16);
            let mut exact = Vec::with_capacity(N);

            for _ in 0..N {
                let v: f64 = rng.sample(StandardNormal);
                sketch.add(v);
                exact.push(v);
            }
            exact.sort_by(|a, b| a.partial_cmp(b).unwrap());

            assert!(sketch.bins.len() <= 16);

            for &q in QUANTILES {
                let got = sketch.quantile(q);
                let want = exact[(N as f64 * q) as usize];
                let rel = ((got - want) / want).abs();
                assert!(
                    rel < 0.09,
                    "quantile({}) = {:.4}, want {:.4} (seed {})",
                    q,
                    got,
                    want,
                    seed
                );
            }
        }
    }

    #[test]
    fn test_mean_and_variance() {
        let blank = Distribution::new(4);
        assert_eq!(blank.mean(), 0.0);
        assert_eq!(blank.variance(), 0.0);

        let dist = std_hist();
        assert!((dist.mean() - 33.27).abs() < 0.01, "mean = {}", dist.mean());

        // exact bins only: variance is the plain population variance
        let small = hist(&[2.0, 6.0, 4.0, 8.0]);
        assert_eq!(small.sum(), 20.0);
        assert_eq!(small.mean(), 5.0);
        assert_eq!(small.variance(), 5.0);
    }

    #[test]
    fn test_empty_distribution_yields_zeros() {
        let blank = Distribution::new(4);
        assert_eq!(blank.count(), 0);
        assert_eq!(blank.min(), 0.0);
        assert_eq!(blank.max(), 0.0);
        assert_eq!(blank.sum(), 0.0);
        assert_eq!(blank.mean(), 0.0);
        assert_eq!(blank.variance(), 0.0);
        assert_eq!(blank.quantile(0.5), 0.0);
    }

    #[test]
    fn test_repeated_values_stack_on_exact_bins() {
        let mut dist = Distribution::new(4);
        for _ in 0..5 {
            dist.add(3.0);
        }

        assert_eq!(dist.bins, vec![Bin { w: 5.0, v: 3.0 }]);
        assert_eq!(dist.quantile(0.5), 3.0);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut dist = hist(&[1.0, 2.0, 3.0]);
        let copy = dist.clone();

        dist.add(100.0);

        assert_eq!(copy.count(), 3);
        assert_eq!(copy.max(), 3.0);
        assert_eq!(dist.count(), 4);
    }

    #[test]
    fn test_pool_round_trip() {
        let src = hist(&[1.0, 2.0, 3.0]);
        let copy = acquire_copy(&src);
        assert_eq!(copy.count(), 3);
        assert_eq!(copy.bins, src.bins);

        release(copy);

        let reused = acquire_copy(&src);
        assert_eq!(reused.count(), 3);
        assert_eq!(reused.min(), 1.0);
    }
}
