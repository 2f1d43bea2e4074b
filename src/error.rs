//! Error types for the external calls made by the pipeline and the runner.
//!
//! None of these escape as panics: the pipeline folds them into
//! [`LocationStatus`](crate::LocationStatus) and the runner into
//! [`AnalysisStatus`](crate::AnalysisStatus).

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to obtain a position from either tier of the position source.
#[derive(Error, Debug)]
pub enum PositionError {
    // ---
    #[error("device positioning is not available on this host")]
    Unavailable,

    #[error("device positioning was denied")]
    Denied,

    #[error("no device fix within {0:?}")]
    Timeout(Duration),

    #[error("device positioning signal error: {0}")]
    Signal(String),

    #[error("IP geolocation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IP geolocation returned status {0}")]
    Http(StatusCode),

    #[error("IP geolocation returned no usable coordinates: {0}")]
    InvalidResponse(String),
}

/// Failure to fetch local insights from the backend.
#[derive(Error, Debug)]
pub enum InsightsError {
    // ---
    #[error("insights backend returned status {0}")]
    Http(StatusCode),

    #[error("insights request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("insights response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure of one analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    // ---
    #[error("analysis backend returned status {0}")]
    Http(StatusCode),

    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("region id {0:?} appears more than once")]
    DuplicateRegion(String),

    #[error("analysis run was superseded by a newer run")]
    Superseded,
}
