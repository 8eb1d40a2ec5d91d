//! Optional cgroup signals: CPU throttling and v1 memory accounting.
//!
//! Every reader here degrades to a default when the controller files are
//! missing (cgroup v1-only hosts, v2-only hosts, bare metal). Absence is a
//! normal answer, not an error.

use std::path::Path;

/// The kernel reports "no memory limit" as `LONG_MAX` rounded down to a page
/// boundary. Anything at or above it means unlimited.
pub const UNLIMITED_SENTINEL_BYTES: u64 = 0x7FFF_FFFF_FFFF_F000;

/// Cumulative CPU throttling charged to this cgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuThrottling {
    pub throttled_usec: u64,
    pub detected: bool,
}

impl CpuThrottling {
    fn from_usec(throttled_usec: u64) -> Self {
        Self {
            throttled_usec,
            detected: throttled_usec > 0,
        }
    }
}

/// cgroup v1 memory accounting for the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerMemory {
    pub used_kb: u64,
    /// `None` when the limit file holds the unlimited sentinel
    pub limit_kb: Option<u64>,
}

impl ContainerMemory {
    /// True when a limit is set and usage has reached `threshold_percent` of it.
    pub fn under_pressure(&self, threshold_percent: f64) -> bool {
        match self.limit_kb {
            Some(limit) if limit > 0 => {
                self.used_kb as f64 >= limit as f64 * threshold_percent / 100.0
            }
            _ => false,
        }
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "optional cgroup file not readable");
            None
        }
    }
}

/// Look up `key` in a flat `key value` stat file.
pub fn stat_value(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? != key {
            return None;
        }
        parts.next()?.parse().ok()
    })
}

/// Read throttling from the v2 `cpu.stat` (`throttled_usec`), falling back to
/// the v1 `cpu.stat` (`throttled_time`, nanoseconds).
pub fn read_cpu_throttling(v2_cpu_stat: &Path, v1_cpu_stat: &Path) -> CpuThrottling {
    if let Some(usec) = read_optional(v2_cpu_stat).and_then(|c| stat_value(&c, "throttled_usec")) {
        return CpuThrottling::from_usec(usec);
    }

    if let Some(nsec) = read_optional(v1_cpu_stat).and_then(|c| stat_value(&c, "throttled_time")) {
        return CpuThrottling::from_usec(nsec / 1_000);
    }

    tracing::debug!("no cgroup throttling counters, reporting none");
    CpuThrottling::default()
}

/// Parse a v1 `memory.limit_in_bytes` value into kilobytes.
///
/// Values at or above [`UNLIMITED_SENTINEL_BYTES`], or too large for `u64`,
/// mean no limit is set.
pub fn parse_limit_kb(raw: &str) -> Option<u64> {
    let bytes = raw.trim().parse::<u64>().ok()?;
    if bytes >= UNLIMITED_SENTINEL_BYTES {
        return None;
    }
    Some(bytes / 1024)
}

/// Read v1 memory usage and limit. `None` when the usage file is absent,
/// i.e. not running under a cgroup v1 memory controller.
pub fn read_container_memory_v1(usage_file: &Path, limit_file: &Path) -> Option<ContainerMemory> {
    let used_bytes = read_optional(usage_file)?.trim().parse::<u64>().ok()?;
    let limit_kb = read_optional(limit_file).and_then(|raw| parse_limit_kb(&raw));

    Some(ContainerMemory {
        used_kb: used_bytes / 1024,
        limit_kb,
    })
}
