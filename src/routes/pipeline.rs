//! Location pipeline control: trigger a resolution, read its state.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info};

use super::AppState;
use crate::pipeline::LocationSnapshot;

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/pipeline", get(current))
        .route("/api/pipeline/resolve", post(resolve))
}

async fn current(State(state): State<AppState>) -> Json<LocationSnapshot> {
    Json(state.pipeline.snapshot())
}

/// Runs a full resolution and returns the resulting snapshot. A failed
/// resolution is still a 200: the failure is part of the reported status.
/// The resolution runs on its own task, so it finishes even if the client
/// goes away.
async fn resolve(State(state): State<AppState>) -> Json<LocationSnapshot> {
    // ---
    info!("POST /api/pipeline/resolve");

    let pipeline = state.pipeline.clone();
    if let Err(e) = tokio::spawn(async move { pipeline.resolve().await }).await {
        error!("Location resolution task failed: {}", e);
    }

    Json(state.pipeline.snapshot())
}
