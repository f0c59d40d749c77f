//! `GET /compute`: the offloaded synthetic workload.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use loadcalc_compute::{ComputationOutcome, FailureKind};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ComputeParams {
    /// Upper bound on extra buffer entries, 1..=1000000 (default 50000).
    pub complexity: Option<String>,
}

/// Outward status for each outcome.
pub fn status_for(outcome: &ComputationOutcome) -> StatusCode {
    match outcome.failure_kind() {
        None => StatusCode::OK,
        Some(FailureKind::InvalidInput) => StatusCode::BAD_REQUEST,
        Some(FailureKind::Interrupted) => StatusCode::SERVICE_UNAVAILABLE,
        Some(FailureKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run one synthetic computation on the worker pool.
#[utoipa::path(
    get,
    path = "/compute",
    tag = "Compute",
    params(ComputeParams),
    responses(
        (status = 200, description = "Computation finished", body = String, content_type = "text/plain"),
        (status = 400, description = "Complexity outside the allowed range or not an integer", body = String, content_type = "text/plain"),
        (status = 500, description = "Computation failed", body = String, content_type = "text/plain"),
        (status = 503, description = "Computation interrupted (shutdown or cancellation)", body = String, content_type = "text/plain"),
    )
)]
pub async fn compute(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ComputeParams>,
) -> (StatusCode, String) {
    let outcome = state.handler.compute(params.complexity.as_deref()).await;
    (status_for(&outcome), outcome.body())
}
