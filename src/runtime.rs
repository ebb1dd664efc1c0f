//! Process runtime collectors.
//!
//! Thin adapters that read process counters and forward them to base
//! instruments. Collectors never register themselves: expose the underlying
//! instrument through its accessor and register it under a name of your
//! choosing, then call `update` on whatever cadence suits you (typically
//! once per flush interval).
//!
//! Memory and scheduler counters come from Linux `/proc/self`; on other
//! platforms [`ProcStats::read`] returns an error and the collectors leave
//! their instruments untouched.

use crate::data::{Derive, Gauge, Reservoir};
use std::fs;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Point-in-time process counters parsed from `/proc/self`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProcStats {
    /// Resident set size in bytes.
    pub resident: u64,
    /// Virtual memory size in bytes.
    pub virtual_size: u64,
    /// Stack size in bytes.
    pub stack: u64,
    /// Number of threads in the process.
    pub threads: u64,
    /// Cumulative minor page faults.
    pub minor_faults: u64,
    /// Cumulative major page faults.
    pub major_faults: u64,
}

impl ProcStats {
    /// Reads the current process counters.
    pub fn read() -> io::Result<ProcStats> {
        let status = fs::read_to_string("/proc/self/status")?;
        let stat = fs::read_to_string("/proc/self/stat")?;
        Ok(ProcStats::parse(&status, &stat))
    }

    fn parse(status: &str, stat: &str) -> ProcStats {
        let mut stats = ProcStats::default();

        for line in status.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            match key {
                "VmRSS" => stats.resident = parse_kb(rest),
                "VmSize" => stats.virtual_size = parse_kb(rest),
                "VmStk" => stats.stack = parse_kb(rest),
                "Threads" => stats.threads = rest.trim().parse().unwrap_or(0),
                _ => {}
            }
        }

        // The comm field may contain spaces; fault counters are counted from
        // the closing paren. minflt is field 10 and majflt field 12, with
        // state as field 3 right after the paren.
        if let Some(pos) = stat.rfind(')') {
            let fields: Vec<&str> = stat[pos + 1..].split_whitespace().collect();
            stats.minor_faults = fields.get(7).and_then(|f| f.parse().ok()).unwrap_or(0);
            stats.major_faults = fields.get(9).and_then(|f| f.parse().ok()).unwrap_or(0);
        }

        stats
    }
}

fn parse_kb(rest: &str) -> u64 {
    let digits = rest.trim().trim_end_matches("kB").trim_end();
    digits.parse::<u64>().unwrap_or(0) * 1024
}

/// Tracks resident set size in bytes.
pub struct Resident {
    g: Arc<Gauge>,
}

impl Resident {
    pub fn new() -> Resident {
        Resident {
            g: Arc::new(Gauge::new(0.0)),
        }
    }

    /// Re-reads process counters and stores the current value.
    pub fn update(&self) -> io::Result<()> {
        let stats = ProcStats::read()?;
        self.g.update(stats.resident as f64);
        Ok(())
    }

    /// The underlying gauge, e.g. for registration.
    pub fn gauge(&self) -> Arc<Gauge> { self.g.clone() }
}

impl Default for Resident {
    fn default() -> Resident { Resident::new() }
}

/// Tracks virtual memory size in bytes.
pub struct Virtual {
    g: Arc<Gauge>,
}

impl Virtual {
    pub fn new() -> Virtual {
        Virtual {
            g: Arc::new(Gauge::new(0.0)),
        }
    }

    /// Re-reads process counters and stores the current value.
    pub fn update(&self) -> io::Result<()> {
        let stats = ProcStats::read()?;
        self.g.update(stats.virtual_size as f64);
        Ok(())
    }

    /// The underlying gauge, e.g. for registration.
    pub fn gauge(&self) -> Arc<Gauge> { self.g.clone() }
}

impl Default for Virtual {
    fn default() -> Virtual { Virtual::new() }
}

/// Tracks stack size in bytes.
pub struct Stack {
    g: Arc<Gauge>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack {
            g: Arc::new(Gauge::new(0.0)),
        }
    }

    /// Re-reads process counters and stores the current value.
    pub fn update(&self) -> io::Result<()> {
        let stats = ProcStats::read()?;
        self.g.update(stats.stack as f64);
        Ok(())
    }

    /// The underlying gauge, e.g. for registration.
    pub fn gauge(&self) -> Arc<Gauge> { self.g.clone() }
}

impl Default for Stack {
    fn default() -> Stack { Stack::new() }
}

/// Tracks the number of live threads.
pub struct Threads {
    g: Arc<Gauge>,
}

impl Threads {
    pub fn new() -> Threads {
        Threads {
            g: Arc::new(Gauge::new(0.0)),
        }
    }

    /// Re-reads process counters and stores the current value.
    pub fn update(&self) -> io::Result<()> {
        let stats = ProcStats::read()?;
        self.g.update(stats.threads as f64);
        Ok(())
    }

    /// The underlying gauge, e.g. for registration.
    pub fn gauge(&self) -> Arc<Gauge> { self.g.clone() }
}

impl Default for Threads {
    fn default() -> Threads { Threads::new() }
}

/// Tracks the rate of minor page faults.
pub struct MinorFaults {
    d: Arc<Derive>,
}

impl MinorFaults {
    pub fn new() -> MinorFaults {
        MinorFaults {
            d: Arc::new(Derive::new(0.0)),
        }
    }

    /// Re-reads process counters and records the cumulative fault count.
    pub fn update(&self) -> io::Result<()> {
        let stats = ProcStats::read()?;
        self.d.update(stats.minor_faults as f64);
        Ok(())
    }

    /// The underlying derive, e.g. for registration.
    pub fn derive(&self) -> Arc<Derive> { self.d.clone() }
}

impl Default for MinorFaults {
    fn default() -> MinorFaults { MinorFaults::new() }
}

/// Tracks the rate of major page faults.
pub struct MajorFaults {
    d: Arc<Derive>,
}

impl MajorFaults {
    pub fn new() -> MajorFaults {
        MajorFaults {
            d: Arc::new(Derive::new(0.0)),
        }
    }

    /// Re-reads process counters and records the cumulative fault count.
    pub fn update(&self) -> io::Result<()> {
        let stats = ProcStats::read()?;
        self.d.update(stats.major_faults as f64);
        Ok(())
    }

    /// The underlying derive, e.g. for registration.
    pub fn derive(&self) -> Arc<Derive> { self.d.clone() }
}

impl Default for MajorFaults {
    fn default() -> MajorFaults { MajorFaults::new() }
}

/// Feeds a runtime's pause ring buffer into a reservoir.
///
/// Runtimes that stall the world (garbage collectors, allocator fences)
/// typically expose a cumulative pause count alongside a fixed-size ring of
/// the most recent pause durations, where `ring[k % ring.len()]` holds the
/// duration of the `k`-th pause. `update` pushes only the durations recorded
/// since the previous call: the common case walks the few new slots, and
/// once more pauses than ring slots have elapsed the whole buffer is
/// consumed.
pub struct Pauses {
    r: Arc<Reservoir>,
    seen: AtomicU32,
}

impl Pauses {
    /// Creates a pause collector backed by a reservoir of the given bin
    /// capacity.
    pub fn new(size: usize) -> Pauses {
        Pauses {
            r: Arc::new(Reservoir::with_size(size)),
            seen: AtomicU32::new(0),
        }
    }

    /// Records the pauses that happened since the previous call, given the
    /// cumulative pause count `total` and the duration ring (nanoseconds).
    pub fn update(&self, total: u32, ring: &[u64]) {
        if ring.is_empty() {
            return;
        }

        let len = ring.len() as u32;
        let prev = self.seen.swap(total, Ordering::SeqCst);

        if total.wrapping_sub(prev) >= len {
            // the buffer wrapped since we last looked: consume all of it
            for &ns in ring {
                self.r.update(ns as f64);
            }
            return;
        }

        let mut i = prev % len;
        let j = total % len;
        if i > j {
            while i < len {
                self.r.update(ring[i as usize] as f64);
                i += 1;
            }
            i = 0;
        }
        while i < j {
            self.r.update(ring[i as usize] as f64);
            i += 1;
        }
    }

    /// The underlying reservoir, e.g. for registration.
    pub fn reservoir(&self) -> Arc<Reservoir> { self.r.clone() }
}

#[cfg(test)]
mod tests {
    use super::{Pauses, ProcStats};

    const STATUS: &str = "Name:\tinstruments\n\
                          VmSize:\t  184628 kB\n\
                          VmRSS:\t   12500 kB\n\
                          VmStk:\t     132 kB\n\
                          Threads:\t8\n";

    const STAT: &str = "12345 (in str uments) S 1 12345 12345 0 -1 4194304 \
                        2066 0 7 0 4 1 0 0 20 0 8 0 429126 189059072 1326";

    #[test]
    fn test_proc_stats_parse() {
        let stats = ProcStats::parse(STATUS, STAT);
        assert_eq!(stats.resident, 12500 * 1024);
        assert_eq!(stats.virtual_size, 184628 * 1024);
        assert_eq!(stats.stack, 132 * 1024);
        assert_eq!(stats.threads, 8);
        assert_eq!(stats.minor_faults, 2066);
        assert_eq!(stats.major_faults, 7);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_proc_stats_read() {
        let stats = ProcStats::read().unwrap();
        assert!(stats.resident > 0);
        assert!(stats.threads >= 1);
    }

    #[test]
    fn test_pauses_incremental() {
        let ring = [10, 20, 30, 40];
        let pauses = Pauses::new(8);

        // two new pauses
        pauses.update(2, &ring);
        assert_eq!(pauses.reservoir().snapshot().count(), 2);

        // one more
        pauses.update(3, &ring);
        assert_eq!(pauses.reservoir().snapshot().count(), 3);

        // no news, no pushes
        pauses.update(3, &ring);
        assert_eq!(pauses.reservoir().snapshot().count(), 3);
    }

    #[test]
    fn test_pauses_wrap_around() {
        let ring = [10, 20, 30, 40];
        let pauses = Pauses::new(8);

        pauses.update(3, &ring);
        assert_eq!(pauses.reservoir().snapshot().count(), 3);

        // 3 -> 5 crosses the end of the ring: slots 3, then 0
        pauses.update(5, &ring);
        let dist = pauses.reservoir().snapshot();
        assert_eq!(dist.count(), 5);
        assert_eq!(dist.max(), 40.0);
    }

    #[test]
    fn test_pauses_full_buffer() {
        let ring = [10, 20, 30, 40];
        let pauses = Pauses::new(8);

        pauses.update(2, &ring);
        // far more pauses than ring slots: the whole buffer is consumed
        pauses.update(9, &ring);
        assert_eq!(pauses.reservoir().snapshot().count(), 6);
    }

    #[test]
    fn test_pauses_empty_ring() {
        let pauses = Pauses::new(8);
        pauses.update(5, &[]);
        assert_eq!(pauses.reservoir().snapshot().count(), 0);
    }
}
