//! Readers for `/proc`: load average, own process stat, host memory

use std::path::Path;

use serde::Serialize;

use crate::error::{read_required, MetricsError, MetricsResult};

/// Host-wide scheduler load from `/proc/loadavg`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadAverage {
    pub load_1m: f64,
    pub load_5m: f64,
    pub load_15m: f64,
    /// Opaque `running/total` pair, passed through as-is
    pub runnable_processes: String,
    pub last_pid: Option<u32>,
}

/// CPU ticks and resident pages charged to the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessUsage {
    pub user_ticks: u64,
    pub kernel_ticks: u64,
    pub rss_pages: u64,
}

impl ProcessUsage {
    pub fn total_ticks(&self) -> u64 {
        self.user_ticks.saturating_add(self.kernel_ticks)
    }

    pub fn cpu_seconds(&self, ticks_per_second: u64) -> f64 {
        self.total_ticks() as f64 / ticks_per_second.max(1) as f64
    }

    pub fn rss_kb(&self, page_size: u64) -> u64 {
        self.rss_pages.saturating_mul(page_size) / 1024
    }
}

/// Host memory totals from `/proc/meminfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostMemory {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl HostMemory {
    /// Share of host memory in use, rounded to two decimals. Zero when the
    /// total is zero.
    pub fn used_percent(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let used = self.total_kb as f64 - self.available_kb as f64;
        round2(used / self.total_kb as f64 * 100.0)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn read_load_average(path: &Path) -> MetricsResult<LoadAverage> {
    let content = read_required(path)?;
    parse_load_average(&content).map_err(|reason| MetricsError::malformed(path, reason))
}

pub fn parse_load_average(content: &str) -> Result<LoadAverage, String> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(format!("expected at least 4 fields, found {}", fields.len()));
    }

    let load = |idx: usize| -> Result<f64, String> {
        fields[idx]
            .parse::<f64>()
            .map_err(|e| format!("field {} ({:?}): {}", idx + 1, fields[idx], e))
    };

    Ok(LoadAverage {
        load_1m: load(0)?,
        load_5m: load(1)?,
        load_15m: load(2)?,
        runnable_processes: fields[3].to_string(),
        last_pid: fields.get(4).and_then(|pid| pid.parse().ok()),
    })
}

pub fn read_process_usage(path: &Path) -> MetricsResult<ProcessUsage> {
    let content = read_required(path)?;
    parse_process_stat(&content).map_err(|reason| MetricsError::malformed(path, reason))
}

/// Parse `/proc/<pid>/stat`.
///
/// The command name (field 2) is parenthesised and may itself contain spaces
/// or parentheses, so positions are counted from the last `)`.
pub fn parse_process_stat(content: &str) -> Result<ProcessUsage, String> {
    let rest = content
        .rfind(')')
        .map(|idx| &content[idx + 1..])
        .ok_or_else(|| "missing command name terminator".to_string())?;

    // rest[0] is field 3 (state)
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let field = |number: usize| -> Result<u64, String> {
        let raw = fields
            .get(number - 3)
            .ok_or_else(|| format!("field {} missing", number))?;
        raw.parse::<i64>()
            .map(|v| v.max(0) as u64)
            .map_err(|e| format!("field {} ({:?}): {}", number, raw, e))
    };

    Ok(ProcessUsage {
        user_ticks: field(14)?,
        kernel_ticks: field(15)?,
        rss_pages: field(24)?,
    })
}

pub fn read_host_memory(path: &Path) -> MetricsResult<HostMemory> {
    let content = read_required(path)?;
    parse_meminfo(&content).map_err(|reason| MetricsError::malformed(path, reason))
}

pub fn parse_meminfo(content: &str) -> Result<HostMemory, String> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total_kb,
            "MemAvailable" => &mut available_kb,
            _ => continue,
        };
        let number = value
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| format!("unparsable value for {}: {:?}", key.trim(), value.trim()))?;
        *slot = Some(number);
    }

    match (total_kb, available_kb) {
        (Some(total_kb), Some(available_kb)) => Ok(HostMemory {
            total_kb,
            available_kb,
        }),
        (None, _) => Err("MemTotal not found".to_string()),
        (_, None) => Err("MemAvailable not found".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MEMINFO: &str = "MemTotal:       16318412 kB\n\
                           MemFree:         1024000 kB\n\
                           MemAvailable:    8159206 kB\n\
                           Buffers:          201348 kB\n\
                           HugePages_Total:       0\n";

    #[test]
    fn parses_load_average() {
        let load = parse_load_average("0.52 0.58 0.59 2/1234 56789\n").unwrap();
        assert_eq!(
            load,
            LoadAverage {
                load_1m: 0.52,
                load_5m: 0.58,
                load_15m: 0.59,
                runnable_processes: "2/1234".to_string(),
                last_pid: Some(56789),
            }
        );
    }

    #[test]
    fn load_average_rejects_short_or_garbage_input() {
        assert!(parse_load_average("").is_err());
        assert!(parse_load_average("0.1 0.2").is_err());
        assert!(parse_load_average("high 0.2 0.3 1/2 3").is_err());
    }

    #[test]
    fn missing_load_average_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_load_average(&dir.path().join("loadavg")).unwrap_err();
        assert!(matches!(err, MetricsError::Unavailable { .. }));
    }

    #[test]
    fn malformed_load_average_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loadavg");
        std::fs::write(&path, "not a load average").unwrap();

        let err = read_load_average(&path).unwrap_err();
        assert!(matches!(err, MetricsError::Malformed { .. }));
    }

    #[test]
    fn parses_process_stat_with_awkward_command_name() {
        // comm contains a space and a closing paren
        let stat = "4242 (my proc) x) S 1 4242 4242 0 -1 4194560 1500 0 0 0 \
                    250 75 0 0 20 0 4 0 123456 104857600 3072 18446744073709551615";
        let usage = parse_process_stat(stat).unwrap();
        assert_eq!(
            usage,
            ProcessUsage {
                user_ticks: 250,
                kernel_ticks: 75,
                rss_pages: 3072,
            }
        );
        assert_eq!(usage.total_ticks(), 325);
        assert_eq!(usage.cpu_seconds(100), 3.25);
        assert_eq!(usage.rss_kb(4096), 12288);
    }

    #[test]
    fn process_stat_rejects_truncated_input() {
        assert!(parse_process_stat("1 (init) S 0 1").is_err());
        assert!(parse_process_stat("no parens here").is_err());
    }

    #[test]
    fn reads_own_process_stat_when_available() {
        let path = Path::new("/proc/self/stat");
        if path.exists() {
            let usage = read_process_usage(path).unwrap();
            assert!(usage.rss_pages > 0);
        }
    }

    #[test]
    fn parses_meminfo_ignoring_unknown_keys() {
        let mem = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(
            mem,
            HostMemory {
                total_kb: 16318412,
                available_kb: 8159206,
            }
        );
        assert_eq!(mem.used_percent(), 50.0);
    }

    #[test]
    fn meminfo_requires_both_keys() {
        assert!(parse_meminfo("MemTotal: 100 kB\n").is_err());
        assert!(parse_meminfo("MemAvailable: 100 kB\n").is_err());
    }

    #[test]
    fn used_percent_guards_zero_total() {
        let mem = HostMemory {
            total_kb: 0,
            available_kb: 0,
        };
        assert_eq!(mem.used_percent(), 0.0);
    }

    #[test]
    fn used_percent_rounds_to_two_decimals() {
        let mem = HostMemory {
            total_kb: 3,
            available_kb: 2,
        };
        assert_eq!(mem.used_percent(), 33.33);
    }
}
