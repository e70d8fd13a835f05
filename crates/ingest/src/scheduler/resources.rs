//! Process resource sampling for batch progress logs.

use std::time::Duration;

/// Kernel clock ticks per second reported in `/proc/<pid>/stat` (USER_HZ).
const CLOCK_TICKS_PER_SEC: u64 = 100;

/// Snapshot of this process' memory and CPU usage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResourceUsage {
    /// Resident set size.
    pub rss_bytes: Option<u64>,
    /// User plus system CPU time consumed so far.
    pub cpu_time: Option<Duration>,
}

impl ResourceUsage {
    /// Resident set size in MiB, for logs.
    pub fn rss_mib(&self) -> Option<f64> {
        self.rss_bytes.map(|b| b as f64 / (1024.0 * 1024.0))
    }
}

/// Sample the current process. Returns `None` where procfs is unavailable.
#[cfg(target_os = "linux")]
pub fn sample() -> Option<ResourceUsage> {
    let status = std::fs::read_to_string("/proc/self/status").ok();
    let stat = std::fs::read_to_string("/proc/self/stat").ok();
    if status.is_none() && stat.is_none() {
        return None;
    }
    Some(ResourceUsage {
        rss_bytes: status.as_deref().and_then(parse_rss_bytes),
        cpu_time: stat.as_deref().and_then(parse_cpu_time),
    })
}

#[cfg(not(target_os = "linux"))]
pub fn sample() -> Option<ResourceUsage> {
    None
}

/// `VmRSS:   123456 kB` from `/proc/self/status`.
fn parse_rss_bytes(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kib * 1024)
}

/// utime + stime from `/proc/self/stat`.
///
/// The command name may contain spaces, so fields are counted from the
/// closing parenthesis; utime and stime are fields 14 and 15.
fn parse_cpu_time(stat: &str) -> Option<Duration> {
    let (_, rest) = stat.rsplit_once(')')?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    let ticks = utime + stime;
    Some(Duration::from_millis(ticks * 1000 / CLOCK_TICKS_PER_SEC))
}
