//! Validate, offload, time, count, classify.
//!
//! [`ComputeHandler::compute`] is the single entry point. It never panics
//! and never returns an error: every failure mode is folded into a
//! [`ComputationOutcome`] that the HTTP layer maps to a status code.

use std::sync::Arc;
use std::time::{Duration, Instant};

use loadcalc_core::ComputeConfig;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::complexity::{Complexity, ComplexityError};
use crate::metrics::MetricsSink;
use crate::pool::{TaskError, WorkerPool};
use crate::workload::WorkloadPlan;

/// Body returned for a successful computation.
pub const STATUS_OK: &str = "OK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Bad complexity parameter. Detected before any work is dispatched.
    InvalidInput,
    /// The job was cancelled while running.
    Interrupted,
    /// The job failed for any other reason.
    Internal,
}

/// Details of a successful run, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComputationReport {
    pub complexity: u32,
    pub buffer_len: usize,
    pub pause: Duration,
    /// Submit-through-complete wall time, as recorded in the timer.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputationOutcome {
    Success(ComputationReport),
    Failure { kind: FailureKind, message: String },
}

impl ComputationOutcome {
    fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure { kind, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Plain-text response body.
    pub fn body(&self) -> String {
        match self {
            Self::Success(_) => STATUS_OK.to_string(),
            Self::Failure { kind: FailureKind::InvalidInput, message } => {
                format!("Invalid complexity parameter: {}", message)
            }
            Self::Failure { kind: FailureKind::Interrupted, message } => message.clone(),
            Self::Failure { kind: FailureKind::Internal, message } => {
                format!("Computation error: {}", message)
            }
        }
    }
}

impl From<ComplexityError> for ComputationOutcome {
    fn from(e: ComplexityError) -> Self {
        Self::failure(FailureKind::InvalidInput, e.to_string())
    }
}

impl From<TaskError> for ComputationOutcome {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Interrupted => Self::failure(FailureKind::Interrupted, e.to_string()),
            TaskError::Internal(msg) => Self::failure(FailureKind::Internal, msg),
        }
    }
}

/// Offloads the synthetic workload onto a [`WorkerPool`] and reports
/// completions to a [`MetricsSink`].
pub struct ComputeHandler {
    config: ComputeConfig,
    pool: Arc<dyn WorkerPool>,
    metrics: Arc<dyn MetricsSink>,
}

impl ComputeHandler {
    pub fn new(config: ComputeConfig, pool: Arc<dyn WorkerPool>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { config, pool, metrics }
    }

    /// Run one computation for the raw `complexity` query value.
    ///
    /// Suspends (without blocking the calling thread) while the job runs.
    /// Dropping the returned future cancels the job.
    pub async fn compute(&self, raw_complexity: Option<&str>) -> ComputationOutcome {
        let complexity = match Complexity::resolve(raw_complexity, &self.config) {
            Ok(c) => c,
            Err(e) => {
                debug!(input = %e.input(), "rejected complexity: {}", e);
                return e.into();
            }
        };

        let plan = WorkloadPlan::draw(complexity, &self.config, &mut rand::thread_rng());
        debug!(
            complexity = complexity.value(),
            size = plan.size,
            pause_ms = plan.pause.as_millis() as u64,
            "dispatching computation"
        );

        let start = Instant::now();
        let handle = self.pool.submit(plan.into_job());
        let task = handle.id();

        match handle.join().await {
            Ok(report) => {
                let elapsed = start.elapsed();
                self.metrics.record_duration(elapsed);
                self.metrics.increment_completions();
                debug!(task, elapsed_ms = elapsed.as_millis() as u64, "computation complete");
                ComputationOutcome::Success(ComputationReport {
                    complexity: complexity.value(),
                    buffer_len: report.buffer_len,
                    pause: report.pause,
                    elapsed,
                })
            }
            Err(e @ TaskError::Interrupted) => {
                warn!(task, complexity = complexity.value(), "computation interrupted");
                e.into()
            }
            Err(e) => {
                error!(task, complexity = complexity.value(), "computation failed: {}", e);
                e.into()
            }
        }
    }
}
