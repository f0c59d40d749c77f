//! Offloaded synthetic compute: complexity validation, a cancellable
//! blocking worker pool, timing instruments, and the handler tying them
//! together.

pub mod complexity;
pub mod handler;
pub mod metrics;
pub mod pool;
pub mod workload;

pub use complexity::{Complexity, ComplexityError};
pub use handler::{ComputationOutcome, ComputationReport, ComputeHandler, FailureKind};
pub use metrics::{ComputeMetrics, MetricsSink, MetricsSnapshot};
pub use pool::{BlockingPool, CancelToken, Job, PoolStats, TaskError, TaskHandle, WorkerPool};
pub use workload::{WorkReport, WorkloadPlan};
