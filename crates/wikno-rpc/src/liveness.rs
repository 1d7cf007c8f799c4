//! Unauthenticated liveness endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use wikno_core::health::{HealthService, ServingStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: ServingStatus,
}

async fn liveness(State(health): State<HealthService>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: health.status(),
    })
}

/// A router serving the liveness check at `path`. Merge it outside any
/// authorization layer.
pub fn router<S>(path: &str, health: HealthService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(path, get(liveness))
        .with_state(health)
}
