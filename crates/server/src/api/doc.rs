//! OpenAPI documentation, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "loadcalc API",
        version = "0.1.0",
        description = "Synthetic CPU + pause workload offloaded to a blocking worker pool, for load testing.",
    ),
    tags(
        (name = "Compute", description = "Offloaded synthetic computation"),
        (name = "Health", description = "Liveness and metrics"),
    ),
    paths(
        crate::api::compute::compute,
        crate::api::health::health,
        crate::api::health::metrics,
    )
)]
pub struct ApiDoc;
