//! Platform constants and host identity.

use nix::unistd::{sysconf, SysconfVar};
use once_cell::sync::OnceCell;
use serde::Serialize;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

const FALLBACK_PAGE_SIZE: u64 = 4096;
const FALLBACK_CLOCK_TICKS: u64 = 100;

static PAGE_SIZE: OnceCell<u64> = OnceCell::new();
static CLOCK_TICKS: OnceCell<u64> = OnceCell::new();

fn sysconf_positive(var: SysconfVar) -> Option<u64> {
    match sysconf(var) {
        Ok(Some(value)) if value > 0 => Some(value as u64),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(?var, %err, "sysconf failed");
            None
        }
    }
}

/// Memory page size in bytes, queried once per process.
pub fn page_size() -> u64 {
    *PAGE_SIZE.get_or_init(|| sysconf_positive(SysconfVar::PAGE_SIZE).unwrap_or(FALLBACK_PAGE_SIZE))
}

/// Scheduler ticks per second (`USER_HZ`), queried once per process.
pub fn clock_ticks_per_second() -> u64 {
    *CLOCK_TICKS.get_or_init(|| sysconf_positive(SysconfVar::CLK_TCK).unwrap_or(FALLBACK_CLOCK_TICKS))
}

/// Identity of the machine the service runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub hostname: Option<String>,
    pub kernel_version: Option<String>,
    pub cpu_count: usize,
}

impl HostInfo {
    /// Resolve host identity. None of this changes at runtime, so callers
    /// resolve it once and reuse it.
    pub fn detect() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new()),
        );

        Self {
            hostname: System::host_name(),
            kernel_version: System::kernel_version(),
            cpu_count: sys.cpus().len().max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_constants_are_positive_and_stable() {
        let page = page_size();
        assert!(page >= 512);
        assert!(page.is_power_of_two());
        assert_eq!(page, page_size());

        let ticks = clock_ticks_per_second();
        assert!(ticks > 0);
        assert_eq!(ticks, clock_ticks_per_second());
    }

    #[test]
    fn host_info_reports_at_least_one_cpu() {
        let host = HostInfo::detect();
        assert!(host.cpu_count >= 1);
    }
}
