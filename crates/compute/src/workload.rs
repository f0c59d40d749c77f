//! The synthetic load: a buffer of transcendental values followed by a pause.

use std::time::Duration;

use loadcalc_core::ComputeConfig;
use rand::Rng;
use serde::Serialize;

use crate::complexity::Complexity;
use crate::pool::{CancelToken, Job, TaskError};

/// Entries filled between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Sizes drawn for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkloadPlan {
    /// Number of `f64` values to allocate and fill.
    pub size: usize,
    /// Blocking pause after the fill.
    pub pause: Duration,
}

/// What a finished job produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkReport {
    pub buffer_len: usize,
    pub pause: Duration,
    /// Sum of the buffer, so the fill cannot be optimised away.
    pub checksum: f64,
}

impl WorkloadPlan {
    /// `size` in `[base_size, base_size + complexity)`, `pause` in
    /// `[min_sleep_ms, min_sleep_ms + max_additional_sleep_ms)`.
    pub fn draw<R: Rng + ?Sized>(complexity: Complexity, config: &ComputeConfig, rng: &mut R) -> Self {
        let extra = rng.gen_range(0..complexity.value().max(1)) as usize;
        let jitter = if config.max_additional_sleep_ms == 0 {
            0
        } else {
            rng.gen_range(0..config.max_additional_sleep_ms)
        };
        Self {
            size: config.base_size + extra,
            pause: Duration::from_millis(config.min_sleep_ms.saturating_add(jitter)),
        }
    }

    /// Run the workload on the current thread, honouring `cancel`.
    pub fn execute(&self, cancel: &CancelToken) -> Result<WorkReport, TaskError> {
        cancel.check()?;

        let mut data: Vec<f64> = Vec::new();
        data.try_reserve_exact(self.size).map_err(|e| {
            TaskError::Internal(format!("failed to allocate {} values: {}", self.size, e))
        })?;

        let mut rng = rand::thread_rng();
        for i in 0..self.size {
            if i % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            let (u1, u2): (f64, f64) = (rng.gen(), rng.gen());
            data.push(u1.sin() * u2.ln_1p());
        }
        let checksum = data.iter().sum();

        cancel.sleep(self.pause)?;

        Ok(WorkReport { buffer_len: data.len(), pause: self.pause, checksum })
    }

    /// Package the plan as a pool [`Job`].
    pub fn into_job(self) -> Job {
        Box::new(move |cancel: &CancelToken| self.execute(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn complexity(raw: &str) -> Complexity {
        Complexity::parse(Some(raw), &ComputeConfig::default()).unwrap()
    }

    #[test]
    fn complexity_one_gives_base_size() {
        let cfg = ComputeConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let plan = WorkloadPlan::draw(complexity("1"), &cfg, &mut rng);
            assert_eq!(plan.size, 10_000);
        }
    }

    #[test]
    fn draws_stay_within_bounds() {
        let cfg = ComputeConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let plan = WorkloadPlan::draw(complexity("500"), &cfg, &mut rng);
            assert!((10_000..10_500).contains(&plan.size), "size {}", plan.size);
            let ms = plan.pause.as_millis();
            assert!((100..500).contains(&ms), "pause {ms}ms");
        }
    }

    #[test]
    fn huge_pause_settings_saturate() {
        let cfg = ComputeConfig { min_sleep_ms: u64::MAX, ..ComputeConfig::default() };
        let plan = WorkloadPlan::draw(complexity("1"), &cfg, &mut StdRng::seed_from_u64(7));
        assert_eq!(plan.pause, Duration::from_millis(u64::MAX));
    }

    #[test]
    fn execute_fills_buffer_and_pauses() {
        let plan = WorkloadPlan { size: 2_000, pause: Duration::from_millis(15) };
        let start = std::time::Instant::now();
        let report = plan.execute(&CancelToken::new()).unwrap();

        assert_eq!(report.buffer_len, 2_000);
        assert!(start.elapsed() >= Duration::from_millis(15));
        // sin(u1) * ln(1 + u2) lies in [0, sin(1) * ln 2) for u in [0, 1).
        assert!(report.checksum >= 0.0);
        assert!(report.checksum < 2_000.0 * 1f64.sin() * 2f64.ln());
    }

    #[test]
    fn execute_stops_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let plan = WorkloadPlan { size: 1_000_000, pause: Duration::from_secs(10) };
        assert_eq!(plan.execute(&token), Err(TaskError::Interrupted));
    }

    #[test]
    fn impossible_allocation_is_internal_error() {
        let plan = WorkloadPlan { size: usize::MAX, pause: Duration::ZERO };
        let err = plan.execute(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, TaskError::Internal(msg) if msg.starts_with("failed to allocate")));
    }
}
