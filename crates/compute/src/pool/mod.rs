//! Worker pool abstraction for blocking compute jobs.
//!
//! Jobs run off the async runtime's core threads so the request-accepting
//! path only dispatches and awaits. Every job receives a [`CancelToken`]
//! it must poll; the pool cancels tokens on shutdown and a [`TaskHandle`]
//! cancels its own token when dropped before completion.

mod blocking;
mod cancel;
mod handle;

pub use blocking::BlockingPool;
pub use cancel::CancelToken;
pub use handle::TaskHandle;

use serde::Serialize;

use crate::workload::WorkReport;

/// How a job ended when it did not produce a report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Computation interrupted")]
    Interrupted,
    #[error("{0}")]
    Internal(String),
}

/// A unit of blocking work. Runs exactly once on a pool thread.
pub type Job = Box<dyn FnOnce(&CancelToken) -> Result<WorkReport, TaskError> + Send + 'static>;

/// Counters describing pool activity since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub submitted: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub interrupted: u64,
    pub failed: u64,
}

/// Executes blocking jobs without occupying the caller's thread.
pub trait WorkerPool: Send + Sync {
    /// Queue a job. The returned handle resolves once the job finishes.
    fn submit(&self, job: Job) -> TaskHandle;

    /// Interrupt every job currently in flight. Returns how many were signalled.
    fn cancel_all(&self) -> usize;

    /// Interrupt in-flight jobs and every job submitted afterwards.
    fn shutdown(&self);

    fn stats(&self) -> PoolStats;
}
