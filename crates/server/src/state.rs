use std::sync::Arc;
use std::time::Instant;

use loadcalc_compute::{BlockingPool, ComputeHandler, ComputeMetrics};
use tokio::runtime::Handle;

pub struct AppState {
    pub config: loadcalc_core::Config,
    pub handler: ComputeHandler,
    pub pool: Arc<BlockingPool>,
    pub metrics: Arc<ComputeMetrics>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the handler to a fresh pool on `runtime` and a fresh metrics sink.
    pub fn build(config: loadcalc_core::Config, runtime: Handle) -> Arc<Self> {
        let pool = Arc::new(BlockingPool::new(runtime));
        let metrics = Arc::new(ComputeMetrics::new());
        let handler = ComputeHandler::new(config.compute.clone(), pool.clone(), metrics.clone());
        Arc::new(Self {
            config,
            handler,
            pool,
            metrics,
            started_at: Instant::now(),
        })
    }
}
