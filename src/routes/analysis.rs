//! Analysis runner control: start a run, read the current run's state.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, warn};

use super::AppState;
use crate::{analysis::AnalysisSnapshot, error::AnalysisError};

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/analysis", get(current))
        .route("/api/analysis/run", post(run))
}

async fn current(State(state): State<AppState>) -> Json<AnalysisSnapshot> {
    Json(state.analysis.snapshot())
}

/// 200 on success, 409 if a newer run overtook this one, 502 on a failed fetch.
/// The run has its own task, so a client disconnect does not cancel it.
async fn run(State(state): State<AppState>) -> (StatusCode, Json<AnalysisSnapshot>) {
    // ---
    info!("POST /api/analysis/run");

    let runner = state.analysis.clone();
    let status = match tokio::spawn(async move { runner.run().await }).await {
        Ok(Ok(_)) => StatusCode::OK,
        Ok(Err(AnalysisError::Superseded)) => StatusCode::CONFLICT,
        Ok(Err(e)) => {
            warn!("Analysis run failed: {}", e);
            StatusCode::BAD_GATEWAY
        }
        Err(e) => {
            error!("Analysis task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(state.analysis.snapshot()))
}
