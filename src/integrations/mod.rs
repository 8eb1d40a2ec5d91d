//! Host and container signal sources

pub mod cgroup;
pub mod procfs;
pub mod system;

use std::path::{Path, PathBuf};

/// Locations of every pseudo-file the collector reads.
///
/// Built from a `/proc` root and a cgroup root so tests can point the
/// collector at a fabricated tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPaths {
    pub loadavg: PathBuf,
    pub process_stat: PathBuf,
    pub meminfo: PathBuf,
    pub cgroup_cpu_stat: PathBuf,
    pub cgroup_v1_cpu_stat: PathBuf,
    pub cgroup_v1_memory_usage: PathBuf,
    pub cgroup_v1_memory_limit: PathBuf,
}

impl SignalPaths {
    pub fn new(proc_root: &Path, cgroup_root: &Path) -> Self {
        Self {
            loadavg: proc_root.join("loadavg"),
            process_stat: proc_root.join("self").join("stat"),
            meminfo: proc_root.join("meminfo"),
            cgroup_cpu_stat: cgroup_root.join("cpu.stat"),
            cgroup_v1_cpu_stat: cgroup_root.join("cpu").join("cpu.stat"),
            cgroup_v1_memory_usage: cgroup_root.join("memory").join("memory.usage_in_bytes"),
            cgroup_v1_memory_limit: cgroup_root.join("memory").join("memory.limit_in_bytes"),
        }
    }
}

impl Default for SignalPaths {
    fn default() -> Self {
        Self::new(Path::new("/proc"), Path::new("/sys/fs/cgroup"))
    }
}
