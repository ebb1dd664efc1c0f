use std::fmt;
use std::sync::Arc;

mod atomic;
mod counter;
mod distribution;
mod gauge;
mod rate;
mod reservoir;

pub use self::counter::Counter;
pub use self::distribution::Distribution;
pub use self::gauge::Gauge;
pub use self::rate::{Derive, Rate};
pub use self::reservoir::{Reservoir, Timer};

pub(crate) use self::distribution::release;

/// A single-value instrument.
///
/// Implement this to register custom instruments that yield one scalar per
/// flush window, like [`Counter`] or [`Gauge`] do.
pub trait Discrete: Send + Sync {
    /// Returns the value for the closing window, draining any accumulated
    /// state.
    fn snapshot(&self) -> f64;
}

/// A sampling instrument.
///
/// Implement this to register custom instruments that yield a distribution
/// per flush window, like [`Reservoir`] or [`Timer`] do.
pub trait Sample: Send + Sync {
    /// Returns a summary of the observations recorded during the closing
    /// window.
    fn snapshot(&self) -> Distribution;
}

impl Discrete for Counter {
    fn snapshot(&self) -> f64 { Counter::snapshot(self) }
}

impl Discrete for Gauge {
    fn snapshot(&self) -> f64 { Gauge::snapshot(self) }
}

impl Discrete for Rate {
    fn snapshot(&self) -> f64 { Rate::snapshot(self) }
}

impl Discrete for Derive {
    fn snapshot(&self) -> f64 { Derive::snapshot(self) }
}

impl Sample for Reservoir {
    fn snapshot(&self) -> Distribution { Reservoir::snapshot(self) }
}

impl Sample for Timer {
    fn snapshot(&self) -> Distribution { Timer::snapshot(self) }
}

/// A registered instrument.
///
/// The registry stores instruments behind this enum so the flush engine only
/// does a single kind check per drained entry. The `Custom` variants admit
/// user-composed instruments through the [`Discrete`] and [`Sample`] traits.
#[derive(Clone)]
pub enum Instrument {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Rate(Arc<Rate>),
    Derive(Arc<Derive>),
    Reservoir(Arc<Reservoir>),
    Timer(Arc<Timer>),
    CustomDiscrete(Arc<dyn Discrete>),
    CustomSample(Arc<dyn Sample>),
}

/// One drained value, ready for delivery to reporters.
pub(crate) enum Reading {
    Discrete(f64),
    Sample(Distribution),
}

impl Instrument {
    /// Drains the instrument into a reading for the current flush cycle.
    pub(crate) fn read(&self) -> Reading {
        match self {
            Instrument::Counter(i) => Reading::Discrete(i.snapshot()),
            Instrument::Gauge(i) => Reading::Discrete(i.snapshot()),
            Instrument::Rate(i) => Reading::Discrete(i.snapshot()),
            Instrument::Derive(i) => Reading::Discrete(i.snapshot()),
            Instrument::Reservoir(i) => Reading::Sample(i.snapshot()),
            Instrument::Timer(i) => Reading::Sample(i.snapshot()),
            Instrument::CustomDiscrete(i) => Reading::Discrete(i.snapshot()),
            Instrument::CustomSample(i) => Reading::Sample(i.snapshot()),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Instrument::Counter(_) => "counter",
            Instrument::Gauge(_) => "gauge",
            Instrument::Rate(_) => "rate",
            Instrument::Derive(_) => "derive",
            Instrument::Reservoir(_) => "reservoir",
            Instrument::Timer(_) => "timer",
            Instrument::CustomDiscrete(_) => "discrete",
            Instrument::CustomSample(_) => "sample",
        }
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instrument").field(&self.kind()).finish()
    }
}

impl From<Counter> for Instrument {
    fn from(i: Counter) -> Instrument { Instrument::Counter(Arc::new(i)) }
}

impl From<Gauge> for Instrument {
    fn from(i: Gauge) -> Instrument { Instrument::Gauge(Arc::new(i)) }
}

impl From<Rate> for Instrument {
    fn from(i: Rate) -> Instrument { Instrument::Rate(Arc::new(i)) }
}

impl From<Derive> for Instrument {
    fn from(i: Derive) -> Instrument { Instrument::Derive(Arc::new(i)) }
}

impl From<Reservoir> for Instrument {
    fn from(i: Reservoir) -> Instrument { Instrument::Reservoir(Arc::new(i)) }
}

impl From<Timer> for Instrument {
    fn from(i: Timer) -> Instrument { Instrument::Timer(Arc::new(i)) }
}

#[cfg(test)]
mod tests {
    use super::{Counter, Discrete, Distribution, Instrument, Reading, Reservoir, Sample};
    use std::sync::Arc;

    struct Doubler(Counter);

    impl Discrete for Doubler {
        fn snapshot(&self) -> f64 { self.0.snapshot() * 2.0 }
    }

    struct Fixed(Vec<f64>);

    impl Sample for Fixed {
        fn snapshot(&self) -> Distribution {
            let mut dist = Distribution::new(8);
            for &v in &self.0 {
                dist.add(v);
            }
            dist
        }
    }

    #[test]
    fn test_builtin_kinds() {
        let counter: Instrument = Counter::new().into();
        assert_eq!(counter.kind(), "counter");

        let reservoir: Instrument = Reservoir::new().into();
        assert_eq!(reservoir.kind(), "reservoir");
    }

    #[test]
    fn test_read_drains_discrete() {
        let counter = Counter::new();
        counter.update(3.0);

        let instrument: Instrument = counter.into();
        match instrument.read() {
            Reading::Discrete(v) => assert_eq!(v, 3.0),
            Reading::Sample(_) => panic!("counter read as sample"),
        }
        match instrument.read() {
            Reading::Discrete(v) => assert_eq!(v, 0.0),
            Reading::Sample(_) => panic!("counter read as sample"),
        }
    }

    #[test]
    fn test_custom_instruments() {
        let doubler = Doubler(Counter::new());
        doubler.0.update(5.0);
        let instrument = Instrument::CustomDiscrete(Arc::new(doubler));
        match instrument.read() {
            Reading::Discrete(v) => assert_eq!(v, 10.0),
            Reading::Sample(_) => panic!("discrete read as sample"),
        }

        let fixed = Instrument::CustomSample(Arc::new(Fixed(vec![1.0, 3.0])));
        match fixed.read() {
            Reading::Sample(dist) => {
                assert_eq!(dist.count(), 2);
                assert_eq!(dist.mean(), 2.0);
            }
            Reading::Discrete(_) => panic!("sample read as discrete"),
        }
    }
}
