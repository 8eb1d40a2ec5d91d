//! Health report collection: signals in, scored report out

pub mod estimator;
pub mod report;
pub mod scorer;

use chrono::Utc;
use std::time::Instant;

use crate::config::{CollectorConfig, Config};
use crate::error::MetricsResult;
use crate::integrations::procfs::{self, round2};
use crate::integrations::system::{self, HostInfo};
use crate::integrations::{cgroup, SignalPaths};

use estimator::CpuUsageEstimator;
use report::{CpuMetrics, HealthReport, HealthSummary, MemoryMetrics};
use scorer::{HealthStatus, ScoreInputs, ScoringWeights};

/// Process-wide collector state: when the service started and the last CPU
/// sample used for the usage estimate.
#[derive(Debug)]
pub struct CollectorState {
    started: Instant,
    estimator: CpuUsageEstimator,
}

impl CollectorState {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(started: Instant) -> Self {
        Self {
            started,
            estimator: CpuUsageEstimator::new(),
        }
    }

    pub fn uptime_seconds(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started).as_secs_f64()
    }
}

impl Default for CollectorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Tunables for a [`HealthCollector`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorOptions {
    pub cold_start_secs: f64,
    pub memory_pressure_percent: f64,
    pub weights: ScoringWeights,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        let collector = CollectorConfig::default();
        Self {
            cold_start_secs: collector.cold_start_secs,
            memory_pressure_percent: collector.memory_pressure_percent,
            weights: ScoringWeights::default(),
        }
    }
}

/// Reads host and container signals and folds them into a [`HealthReport`].
///
/// Shared across requests; only the CPU estimator holds mutable state.
#[derive(Debug)]
pub struct HealthCollector {
    paths: SignalPaths,
    options: CollectorOptions,
    state: CollectorState,
    host: HostInfo,
}

impl HealthCollector {
    pub fn new(paths: SignalPaths, options: CollectorOptions) -> Self {
        Self::with_state(paths, options, CollectorState::new())
    }

    pub fn with_state(paths: SignalPaths, options: CollectorOptions, state: CollectorState) -> Self {
        Self {
            paths,
            options,
            state,
            host: HostInfo::detect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let paths = SignalPaths::new(&config.collector.proc_root, &config.collector.cgroup_root);
        let options = CollectorOptions {
            cold_start_secs: config.collector.cold_start_secs,
            memory_pressure_percent: config.collector.memory_pressure_percent,
            weights: config.scoring.clone(),
        };
        Self::new(paths, options)
    }

    /// Collect a fresh report.
    ///
    /// Fails only when a required source (load average, process stat, host
    /// memory) is missing or unparsable. cgroup sources are optional.
    pub fn collect_report(&self) -> MetricsResult<HealthReport> {
        self.collect_at(Instant::now())
    }

    pub(crate) fn collect_at(&self, now: Instant) -> MetricsResult<HealthReport> {
        let load = procfs::read_load_average(&self.paths.loadavg)?;
        let process = procfs::read_process_usage(&self.paths.process_stat)?;
        let host_memory = procfs::read_host_memory(&self.paths.meminfo)?;

        let throttling =
            cgroup::read_cpu_throttling(&self.paths.cgroup_cpu_stat, &self.paths.cgroup_v1_cpu_stat);
        let container = cgroup::read_container_memory_v1(
            &self.paths.cgroup_v1_memory_usage,
            &self.paths.cgroup_v1_memory_limit,
        );

        let cpu_seconds = process.cpu_seconds(system::clock_ticks_per_second());
        let cpu_usage_percent_est = self.state.estimator.observe(cpu_seconds, now);

        let uptime_seconds = self.state.uptime_seconds(now);
        let cold_start = scorer::is_cold_start(uptime_seconds, self.options.cold_start_secs);
        let used_percent = host_memory.used_percent();

        let score = scorer::score(
            &ScoreInputs {
                memory_used_percent: used_percent,
                load_1m: load.load_1m,
                throttling_detected: throttling.detected,
                cold_start,
            },
            &self.options.weights,
        );
        let status = HealthStatus::from_score(score);

        tracing::debug!(
            score,
            %status,
            load_1m = load.load_1m,
            used_percent,
            throttled = throttling.detected,
            cold_start,
            "health report collected"
        );

        Ok(HealthReport {
            timestamp: Utc::now(),
            uptime_seconds: round2(uptime_seconds),
            cpu_metrics: CpuMetrics {
                load_1m: load.load_1m,
                load_5m: load.load_5m,
                load_15m: load.load_15m,
                runnable_processes: load.runnable_processes,
                last_pid: load.last_pid,
                process_user_ticks: process.user_ticks,
                process_kernel_ticks: process.kernel_ticks,
                process_cpu_seconds: round2(cpu_seconds),
                cpu_usage_percent_est,
                throttled_usec: throttling.throttled_usec,
                throttling_detected: throttling.detected,
            },
            memory_metrics: MemoryMetrics {
                host_total_kb: host_memory.total_kb,
                host_available_kb: host_memory.available_kb,
                used_percent,
                process_rss_kb: process.rss_kb(system::page_size()),
                container_used_kb: container.map(|c| c.used_kb),
                container_limit_kb: container.and_then(|c| c.limit_kb),
                memory_pressure: container
                    .map(|c| c.under_pressure(self.options.memory_pressure_percent))
                    .unwrap_or(false),
            },
            health: HealthSummary {
                score,
                message: status.message().to_string(),
                cold_start,
            },
            host: self.host.clone(),
        })
    }
}
