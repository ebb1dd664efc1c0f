//! Collects metrics over discrete time windows.
//!
//! Observations recorded during a window are aggregated in process and
//! flushed to every subscribed reporter on a fixed cadence. A flushed
//! snapshot reflects only the window that produced it; nothing decays
//! across windows, contrary to EWMA based metrics.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! // Create a new registry instance, flushing at minutely intervals.
//! let registry = instruments::Registry::new(Duration::from_secs(60));
//!
//! // Watch errors that may happen during flush cycles.
//! let errors = registry.errors();
//! std::thread::spawn(move || {
//!     for err in errors.iter() {
//!         eprintln!("flush error: {}", err);
//!     }
//! });
//!
//! // Fetch a timer and measure something.
//! let timer = registry.timer("processing-time", &[]);
//! timer.time(|| {
//!     // ...
//! });
//!
//! // Flush all accumulated data and release resources on exit.
//! registry.close().unwrap();
//! ```
//!
//! Two kinds of instruments are supported: discrete instruments yield a
//! single value per window, sample instruments yield a [`Distribution`].
//! The base instruments are:
//!
//! - [`Counter`]: a total that can be incremented or decremented.
//! - [`Rate`]: the rate of values per time unit.
//! - [`Derive`]: the rate of deltas with the previously observed value.
//! - [`Gauge`]: the last recorded value.
//! - [`Reservoir`]: samples values into a bounded streaming histogram.
//! - [`Timer`]: tracks durations.
//!
//! Custom instruments can be registered as long as they implement the
//! [`Discrete`] or [`Sample`] trait.

mod configuration;
mod convenience;
mod data;
mod error;
mod id;
mod registry;
mod reporter;
pub mod runtime;

pub use self::configuration::Configuration;
pub use self::data::{
    Counter, Derive, Discrete, Distribution, Gauge, Instrument, Rate, Reservoir, Sample, Timer,
};
pub use self::error::{BoxedError, Error};
pub use self::id::MetricId;
pub use self::registry::Registry;
pub use self::reporter::Reporter;
