//! CPU usage estimate from two successive cumulative samples

use parking_lot::Mutex;
use std::time::Instant;

use crate::integrations::procfs::round2;

/// Cumulative CPU time observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    pub cpu_seconds: f64,
    pub at: Instant,
}

/// Turns cumulative process CPU time into a usage percentage by finite
/// difference against the previous observation.
///
/// The previous sample is shared by every caller; reading it, computing the
/// delta and storing the new sample happen under one lock.
#[derive(Debug, Default)]
pub struct CpuUsageEstimator {
    last: Mutex<Option<CpuSample>>,
}

impl CpuUsageEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `cpu_seconds` observed at `now` and return the usage since the
    /// previous observation.
    ///
    /// Returns `None` on the first observation and whenever the clock has not
    /// advanced past the stored sample. The result is not capped at 100:
    /// multi-threaded bursts can exceed one core.
    pub fn observe(&self, cpu_seconds: f64, now: Instant) -> Option<f64> {
        let mut last = self.last.lock();

        let estimate = last.and_then(|prev| {
            let elapsed = now.checked_duration_since(prev.at)?.as_secs_f64();
            if elapsed <= 0.0 {
                return None;
            }
            let busy = cpu_seconds - prev.cpu_seconds;
            Some(round2(100.0 * busy / elapsed))
        });

        *last = Some(CpuSample {
            cpu_seconds,
            at: now,
        });
        estimate
    }

    /// The most recently stored sample
    #[cfg(test)]
    pub fn last_sample(&self) -> Option<CpuSample> {
        *self.last.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn first_observation_is_unavailable() {
        let estimator = CpuUsageEstimator::new();
        assert_eq!(estimator.observe(1.0, Instant::now()), None);
        assert!(estimator.last_sample().is_some());
    }

    #[test]
    fn computes_percentage_between_samples() {
        let estimator = CpuUsageEstimator::new();
        let t0 = Instant::now();
        estimator.observe(10.0, t0);

        // half a core over two seconds
        let usage = estimator.observe(11.0, t0 + Duration::from_secs(2));
        assert_eq!(usage, Some(50.0));
    }

    #[test]
    fn multi_core_bursts_are_not_capped() {
        let estimator = CpuUsageEstimator::new();
        let t0 = Instant::now();
        estimator.observe(0.0, t0);

        let usage = estimator.observe(3.0, t0 + Duration::from_secs(1));
        assert_eq!(usage, Some(300.0));
    }

    #[test]
    fn rounds_to_two_decimals() {
        let estimator = CpuUsageEstimator::new();
        let t0 = Instant::now();
        estimator.observe(0.0, t0);

        let usage = estimator.observe(1.0, t0 + Duration::from_secs(3));
        assert_eq!(usage, Some(33.33));
    }

    #[test]
    fn stalled_clock_is_unavailable_but_still_updates() {
        let estimator = CpuUsageEstimator::new();
        let t0 = Instant::now();
        estimator.observe(1.0, t0);

        assert_eq!(estimator.observe(2.0, t0), None);
        assert_eq!(estimator.last_sample().map(|s| s.cpu_seconds), Some(2.0));
    }

    #[test]
    fn clock_going_backwards_is_unavailable() {
        let estimator = CpuUsageEstimator::new();
        let t0 = Instant::now();
        estimator.observe(1.0, t0 + Duration::from_secs(5));

        assert_eq!(estimator.observe(2.0, t0), None);
        assert_eq!(estimator.last_sample().map(|s| s.at), Some(t0));
    }

    #[test]
    fn concurrent_observers_never_tear_the_stored_sample() {
        const THREADS: usize = 16;
        const ROUNDS: usize = 200;

        let estimator = CpuUsageEstimator::new();
        let base = Instant::now();
        let produced = AtomicUsize::new(0);

        // cpu_seconds and the timestamp offset are derived from the same
        // counter, so a consistent sample always satisfies at - base == cpu ms.
        std::thread::scope(|scope| {
            for thread in 0..THREADS {
                let estimator = &estimator;
                let produced = &produced;
                scope.spawn(move || {
                    for round in 0..ROUNDS {
                        let millis = (thread * ROUNDS + round) as u64;
                        let at = base + Duration::from_millis(millis);
                        if let Some(usage) = estimator.observe(millis as f64 / 1000.0, at) {
                            assert!(usage.is_finite());
                            produced.fetch_add(1, Ordering::Relaxed);
                        }

                        let sample = estimator.last_sample().unwrap();
                        let offset = sample.at.duration_since(base).as_millis() as f64;
                        assert_eq!(offset / 1000.0, sample.cpu_seconds);
                    }
                });
            }
        });

        assert!(produced.load(Ordering::Relaxed) < THREADS * ROUNDS);
    }
}
