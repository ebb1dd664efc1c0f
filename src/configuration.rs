use crate::registry::Registry;
use std::time::Duration;

/// A configuration builder for [`Registry`].
#[derive(Clone, Debug)]
pub struct Configuration {
    pub(crate) flush_interval: Duration,
    pub(crate) prefix: String,
    pub(crate) tags: Vec<String>,
    pub(crate) errors_capacity: usize,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            flush_interval: Duration::from_secs(60),
            prefix: String::new(),
            tags: Vec::new(),
            errors_capacity: 64,
        }
    }
}

impl Configuration {
    /// Creates a new `Configuration` with default values.
    pub fn new() -> Configuration { Default::default() }

    /// Sets the cadence of the periodic flush task.
    ///
    /// Defaults to sixty seconds. Values below one second are rejected at
    /// build time and replaced by the default.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Sets the prefix prepended to every emitted metric name.
    ///
    /// Metrics registered with a leading `|` in their name opt out of the
    /// prefix.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_owned();
        self
    }

    /// Sets the global tags appended to every emitted metric.
    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| (*t).to_owned()).collect();
        self
    }

    /// Sets the capacity of the pollable error channel.
    ///
    /// Defaults to 64. Errors beyond the capacity are logged and dropped.
    pub fn errors_capacity(mut self, capacity: usize) -> Self {
        self.errors_capacity = capacity;
        self
    }

    /// Builds a registry with a running periodic flush task.
    pub fn build(self) -> Registry { Registry::from_config(self, true) }

    /// Builds a registry without a flush task; flushing is manual.
    pub fn build_unstarted(self) -> Registry { Registry::from_config(self, false) }
}
