use crate::data::{Counter, Derive, Gauge, Instrument, Rate, Reservoir, Timer};
use crate::error::Error;
use crate::id::MetricId;
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Typed fetch helpers.
///
/// Each helper fetches the instrument at `name`/`tags`, creating it when the
/// identifier is vacant. If an instrument of a different kind is already
/// stored there, the mismatch is surfaced to the error sink and a detached,
/// unregistered instrument of the requested kind is returned, so the call
/// site always gets something usable.
impl Registry {
    /// Fetches or creates the counter at `name`/`tags`.
    pub fn counter(&self, name: &str, tags: &[&str]) -> Arc<Counter> {
        match self.fetch(name, tags, || Instrument::Counter(Arc::new(Counter::new()))) {
            Instrument::Counter(counter) => counter,
            other => {
                self.mismatch("counter", name, tags, &other);
                Arc::new(Counter::new())
            }
        }
    }

    /// Fetches or creates the per-second rate at `name`/`tags`.
    pub fn rate(&self, name: &str, tags: &[&str]) -> Arc<Rate> {
        match self.fetch(name, tags, || Instrument::Rate(Arc::new(Rate::new()))) {
            Instrument::Rate(rate) => rate,
            other => {
                self.mismatch("rate", name, tags, &other);
                Arc::new(Rate::new())
            }
        }
    }

    /// Fetches or creates a rate reported per `unit` at `name`/`tags`.
    pub fn rate_with_unit(&self, name: &str, tags: &[&str], unit: Duration) -> Arc<Rate> {
        match self.fetch(name, tags, || {
            Instrument::Rate(Arc::new(Rate::with_unit(unit)))
        }) {
            Instrument::Rate(rate) => rate,
            other => {
                self.mismatch("rate", name, tags, &other);
                Arc::new(Rate::with_unit(unit))
            }
        }
    }

    /// Fetches or creates the derive at `name`/`tags`, starting from the
    /// observed value `v`.
    pub fn derive(&self, name: &str, tags: &[&str], v: f64) -> Arc<Derive> {
        match self.fetch(name, tags, || Instrument::Derive(Arc::new(Derive::new(v)))) {
            Instrument::Derive(derive) => derive,
            other => {
                self.mismatch("derive", name, tags, &other);
                Arc::new(Derive::new(v))
            }
        }
    }

    /// Fetches or creates a derive reported per `unit` at `name`/`tags`.
    pub fn derive_with_unit(
        &self,
        name: &str,
        tags: &[&str],
        v: f64,
        unit: Duration,
    ) -> Arc<Derive> {
        match self.fetch(name, tags, || {
            Instrument::Derive(Arc::new(Derive::with_unit(v, unit)))
        }) {
            Instrument::Derive(derive) => derive,
            other => {
                self.mismatch("derive", name, tags, &other);
                Arc::new(Derive::with_unit(v, unit))
            }
        }
    }

    /// Fetches or creates the gauge at `name`/`tags`, initialized to `v`.
    pub fn gauge(&self, name: &str, tags: &[&str], v: f64) -> Arc<Gauge> {
        match self.fetch(name, tags, || Instrument::Gauge(Arc::new(Gauge::new(v)))) {
            Instrument::Gauge(gauge) => gauge,
            other => {
                self.mismatch("gauge", name, tags, &other);
                Arc::new(Gauge::new(v))
            }
        }
    }

    /// Fetches or creates the reservoir at `name`/`tags`.
    pub fn reservoir(&self, name: &str, tags: &[&str]) -> Arc<Reservoir> {
        match self.fetch(name, tags, || {
            Instrument::Reservoir(Arc::new(Reservoir::new()))
        }) {
            Instrument::Reservoir(reservoir) => reservoir,
            other => {
                self.mismatch("reservoir", name, tags, &other);
                Arc::new(Reservoir::new())
            }
        }
    }

    /// Fetches or creates a reservoir with a custom bin capacity.
    pub fn reservoir_with_size(&self, name: &str, tags: &[&str], size: usize) -> Arc<Reservoir> {
        match self.fetch(name, tags, || {
            Instrument::Reservoir(Arc::new(Reservoir::with_size(size)))
        }) {
            Instrument::Reservoir(reservoir) => reservoir,
            other => {
                self.mismatch("reservoir", name, tags, &other);
                Arc::new(Reservoir::with_size(size))
            }
        }
    }

    /// Fetches or creates the timer at `name`/`tags`.
    pub fn timer(&self, name: &str, tags: &[&str]) -> Arc<Timer> {
        match self.fetch(name, tags, || Instrument::Timer(Arc::new(Timer::new()))) {
            Instrument::Timer(timer) => timer,
            other => {
                self.mismatch("timer", name, tags, &other);
                Arc::new(Timer::new())
            }
        }
    }

    /// Fetches or creates a timer with a custom bin capacity.
    pub fn timer_with_size(&self, name: &str, tags: &[&str], size: usize) -> Arc<Timer> {
        match self.fetch(name, tags, || {
            Instrument::Timer(Arc::new(Timer::with_size(size)))
        }) {
            Instrument::Timer(timer) => timer,
            other => {
                self.mismatch("timer", name, tags, &other);
                Arc::new(Timer::with_size(size))
            }
        }
    }

    fn mismatch(&self, expected: &'static str, name: &str, tags: &[&str], found: &Instrument) {
        self.handle_error(Error::RegistrationMismatch {
            expected,
            found: found.kind(),
            id: MetricId::new(name, tags).as_str().to_owned(),
        });
    }
}
