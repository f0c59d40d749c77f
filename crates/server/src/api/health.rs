//! Health and metrics endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use loadcalc_compute::{MetricsSnapshot, PoolStats, WorkerPool};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub profile: String,
    pub in_flight: u64,
    pub shutting_down: bool,
}

/// Liveness and current pool load.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Server is up"))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        profile: state.config.profile_label().to_string(),
        in_flight: state.pool.stats().in_flight,
        shutting_down: state.pool.is_shutting_down(),
    })
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub compute: MetricsSnapshot,
    pub pool: PoolStats,
    pub uptime_secs: f64,
    pub config: serde_json::Value,
}

/// Compute timer, completion counter and pool counters.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses((status = 200, description = "Metrics snapshot"))
)]
pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        compute: state.metrics.snapshot(),
        pool: state.pool.stats(),
        uptime_secs: state.started_at.elapsed().as_secs_f64(),
        config: state.config.redacted_summary(),
    })
}
