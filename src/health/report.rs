//! Serialized shape of a health report

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::integrations::system::HostInfo;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: f64,
    pub cpu_metrics: CpuMetrics,
    pub memory_metrics: MemoryMetrics,
    pub health: HealthSummary,
    pub host: HostInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuMetrics {
    pub load_1m: f64,
    pub load_5m: f64,
    pub load_15m: f64,
    pub runnable_processes: String,
    pub last_pid: Option<u32>,
    pub process_user_ticks: u64,
    pub process_kernel_ticks: u64,
    pub process_cpu_seconds: f64,
    /// `null` on the first report and whenever no time has elapsed
    pub cpu_usage_percent_est: Option<f64>,
    pub throttled_usec: u64,
    pub throttling_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryMetrics {
    pub host_total_kb: u64,
    pub host_available_kb: u64,
    pub used_percent: f64,
    pub process_rss_kb: u64,
    pub container_used_kb: Option<u64>,
    pub container_limit_kb: Option<u64>,
    pub memory_pressure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub score: u8,
    pub message: String,
    pub cold_start: bool,
}
