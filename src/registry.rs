use crate::configuration::Configuration;
use crate::data::{self, Instrument, Reading};
use crate::error::Error;
use crate::id::MetricId;
use crate::reporter::Reporter;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::mem;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type InstrumentMap = HashMap<MetricId, Instrument, FnvBuildHasher>;

/// An indexed collection of named instruments, drained on a fixed cadence.
///
/// A started registry owns one periodic task that flushes every registered
/// instrument to all subscribed reporters; flush errors are logged and kept
/// on a bounded channel the caller may poll via [`Registry::errors`]. Call
/// or defer [`Registry::close`] on shutdown to drain one final cycle.
pub struct Registry {
    core: Arc<Core>,
    flusher: Mutex<Option<Flusher>>,
}

struct Flusher {
    closing: Sender<()>,
    closed: Receiver<Result<(), Error>>,
    handle: thread::JoinHandle<()>,
}

struct Core {
    instruments: RwLock<InstrumentMap>,
    reporters: Mutex<Vec<Box<dyn Reporter>>>,
    tags: RwLock<Vec<String>>,
    prefix: String,
    errors_tx: Sender<Error>,
    errors_rx: Receiver<Error>,
}

impl Registry {
    /// Creates a registry flushing at `flush_interval`.
    ///
    /// Intervals below one second fall back to the default of sixty seconds.
    pub fn new(flush_interval: Duration) -> Registry {
        Configuration::new().flush_interval(flush_interval).build()
    }

    /// Creates a registry without a periodic flush task; flushing is left to
    /// the caller and [`Registry::close`] has nothing to stop.
    pub fn unstarted() -> Registry { Configuration::new().build_unstarted() }

    /// Gets a builder to configure a `Registry` instance with.
    pub fn builder() -> Configuration { Configuration::new() }

    pub(crate) fn from_config(conf: Configuration, started: bool) -> Registry {
        let (errors_tx, errors_rx) = bounded(conf.errors_capacity);
        let core = Arc::new(Core {
            instruments: RwLock::new(InstrumentMap::default()),
            reporters: Mutex::new(Vec::new()),
            tags: RwLock::new(conf.tags),
            prefix: conf.prefix,
            errors_tx,
            errors_rx,
        });

        let flusher = if started {
            let interval = if conf.flush_interval < Duration::from_secs(1) {
                Duration::from_secs(60)
            } else {
                conf.flush_interval
            };
            Some(spawn_flusher(core.clone(), interval))
        } else {
            None
        };

        Registry {
            core,
            flusher: Mutex::new(flusher),
        }
    }

    /// Registers `instrument` under `name`/`tags`, replacing any existing
    /// entry with the same identifier.
    pub fn register(&self, name: &str, tags: &[&str], instrument: Instrument) {
        let key = MetricId::new(name, tags);
        self.core.instruments.write().insert(key, instrument);
    }

    /// Looks up the instrument registered under `name`/`tags`.
    pub fn get(&self, name: &str, tags: &[&str]) -> Option<Instrument> {
        let key = MetricId::new(name, tags);
        self.core.instruments.read().get(&key).cloned()
    }

    /// Returns the instrument stored under `name`/`tags`, inserting the
    /// factory's result first if the identifier is vacant. An existing
    /// instrument always wins over the factory.
    pub fn fetch<F>(&self, name: &str, tags: &[&str], factory: F) -> Instrument
    where
        F: FnOnce() -> Instrument,
    {
        let key = MetricId::new(name, tags);

        if let Some(found) = self.core.instruments.read().get(&key) {
            return found.clone();
        }

        let mut instruments = self.core.instruments.write();
        instruments.entry(key).or_insert_with(factory).clone()
    }

    /// Removes the instrument registered under `name`/`tags`.
    pub fn unregister(&self, name: &str, tags: &[&str]) {
        let key = MetricId::new(name, tags);
        self.core.instruments.write().remove(&key);
    }

    /// Number of currently registered instruments.
    pub fn size(&self) -> usize { self.core.instruments.read().len() }

    /// Attaches a reporter; every flush cycle from now on includes it.
    pub fn subscribe<R>(&self, reporter: R)
    where
        R: Reporter + 'static,
    {
        self.core.reporters.lock().push(Box::new(reporter));
    }

    /// Global tags appended to every emitted metric.
    pub fn tags(&self) -> Vec<String> { self.core.tags.read().clone() }

    /// Replaces the global tag list.
    pub fn set_tags(&self, tags: &[&str]) {
        *self.core.tags.write() = tags.iter().map(|t| (*t).to_owned()).collect();
    }

    /// Appends to the global tag list.
    pub fn add_tags(&self, tags: &[&str]) {
        self.core
            .tags
            .write()
            .extend(tags.iter().map(|t| (*t).to_owned()));
    }

    /// The channel carrying errors from periodic flush cycles.
    ///
    /// The channel is bounded; when nobody polls it, overflowing errors are
    /// dropped after being logged.
    pub fn errors(&self) -> Receiver<Error> { self.core.errors_rx.clone() }

    /// Drains every registered instrument and delivers the readings to all
    /// subscribed reporters.
    ///
    /// The periodic task calls this on every tick; it may also be called
    /// manually. Updates that arrive once the drain has happened become part
    /// of the next cycle.
    pub fn flush(&self) -> Result<(), Error> { self.core.flush() }

    /// Stops the periodic task, drains one final cycle and returns its
    /// outcome. Safe to call multiple times; only the first call does the
    /// work.
    pub fn close(&self) -> Result<(), Error> {
        let flusher = self.flusher.lock().take();
        match flusher {
            Some(Flusher {
                closing,
                closed,
                handle,
            }) => {
                drop(closing);
                let result = closed.recv().unwrap_or(Ok(()));
                let _ = handle.join();
                result
            }
            None => Ok(()),
        }
    }

    pub(crate) fn handle_error(&self, err: Error) { self.core.handle_error(err); }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            self.core.handle_error(err);
        }
    }
}

impl Core {
    /// Runs one flush cycle: `prep`, one call per drained instrument, then
    /// `flush`, for every reporter in subscription order.
    fn flush(&self) -> Result<(), Error> {
        let global_tags = self.tags.read().clone();
        let mut reporters = self.reporters.lock();

        for reporter in reporters.iter_mut() {
            reporter.prep().map_err(Error::Reporter)?;
        }

        for (id, instrument) in self.reset() {
            let (name, mut tags) = id.split();
            let name = match name.strip_prefix('|') {
                Some(reserved) => reserved.to_owned(),
                None => format!("{}{}", self.prefix, name),
            };
            tags.extend(global_tags.iter().map(String::as_str));

            match instrument.read() {
                Reading::Discrete(value) => {
                    for reporter in reporters.iter_mut() {
                        reporter
                            .discrete(&name, &tags, value)
                            .map_err(Error::Reporter)?;
                    }
                }
                Reading::Sample(dist) => {
                    for reporter in reporters.iter_mut() {
                        reporter
                            .sample(&name, &tags, &dist)
                            .map_err(Error::Reporter)?;
                    }
                    data::release(dist);
                }
            }
        }

        for reporter in reporters.iter_mut() {
            reporter.flush().map_err(Error::Reporter)?;
        }
        Ok(())
    }

    /// Swaps the instrument map for a fresh one; updates racing with the
    /// swap land in the new map and surface next cycle.
    fn reset(&self) -> InstrumentMap {
        let mut instruments = self.instruments.write();
        mem::take(&mut *instruments)
    }

    fn handle_error(&self, err: Error) {
        log::error!("instruments: {}", err);
        let _ = self.errors_tx.try_send(err);
    }
}

fn spawn_flusher(core: Arc<Core>, interval: Duration) -> Flusher {
    let (closing_tx, closing_rx) = bounded::<()>(0);
    let (closed_tx, closed_rx) = bounded(1);

    let handle = thread::Builder::new()
        .name("instruments-flush".to_owned())
        .spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(closing_rx) -> _ => {
                        let _ = closed_tx.send(core.flush());
                        return;
                    }
                    recv(ticker) -> _ => {
                        if let Err(err) = core.flush() {
                            core.handle_error(err);
                        }
                    }
                }
            }
        })
        .expect("failed to spawn instruments-flush thread");

    Flusher {
        closing: closing_tx,
        closed: closed_rx,
        handle,
    }
}
