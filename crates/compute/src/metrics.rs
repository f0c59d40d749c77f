//! Compute timer and completion counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Name of the duration instrument.
pub const COMPUTE_TIMER: &str = "calculator.compute.timer";
/// Name of the completion counter.
pub const EVENTS_COUNTER: &str = "calculator_events_sent_total";

/// Where the handler reports successful computations.
///
/// Implementations are shared by every concurrent request and must be
/// internally synchronised. Both operations are commutative.
pub trait MetricsSink: Send + Sync {
    fn record_duration(&self, elapsed: Duration);
    fn increment_completions(&self);
}

#[derive(Debug)]
struct Timer {
    count: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }
}

/// Lock-free in-memory [`MetricsSink`].
#[derive(Debug, Default)]
pub struct ComputeMetrics {
    timer: Timer,
    completions: AtomicU64,
}

/// Point-in-time view of the compute timer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub name: &'static str,
    pub count: u64,
    pub total_ms: f64,
    pub mean_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub name: &'static str,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub timer: TimerSnapshot,
    pub events: CounterSnapshot,
}

fn nanos_to_ms(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

impl ComputeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completions(&self) -> u64 {
        self.completions.load(Ordering::Relaxed)
    }

    /// Number of durations recorded so far.
    pub fn recorded(&self) -> u64 {
        self.timer.count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let count = self.timer.count.load(Ordering::Relaxed);
        let total = self.timer.total_nanos.load(Ordering::Relaxed);
        let (min, max) = if count == 0 {
            (None, None)
        } else {
            (
                Some(nanos_to_ms(self.timer.min_nanos.load(Ordering::Relaxed))),
                Some(nanos_to_ms(self.timer.max_nanos.load(Ordering::Relaxed))),
            )
        };
        MetricsSnapshot {
            timer: TimerSnapshot {
                name: COMPUTE_TIMER,
                count,
                total_ms: nanos_to_ms(total),
                mean_ms: (count > 0).then(|| nanos_to_ms(total) / count as f64),
                min_ms: min,
                max_ms: max,
            },
            events: CounterSnapshot { name: EVENTS_COUNTER, value: self.completions() },
        }
    }
}

impl MetricsSink for ComputeMetrics {
    fn record_duration(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.timer.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.timer.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.timer.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.timer.count.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_completions(&self) {
        self.completions.fetch_add(1, Ordering::Relaxed);
    }
}
