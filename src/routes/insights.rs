//! `GET /api/insights`: weather plus health intelligence for a locality.
//!
//! This is the backend the pipeline's `InsightsClient` talks to. Weather
//! failures degrade to `"N/A"` fields rather than failing the request.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::{
    health_trends::simulated_health,
    models::{EnvironmentSnapshot, HealthIntelligence, Position},
    weather::fetch_weather,
};

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/insights", get(handler))
}

#[derive(Debug, Deserialize)]
struct InsightsQuery {
    // ---
    lat: f64,
    lon: f64,
    city: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Serialize)]
struct InsightsResponse {
    // ---
    location: LocationEcho,
    environment: EnvironmentSnapshot,
    health_intelligence: HealthIntelligence,
}

#[derive(Debug, Serialize)]
struct LocationEcho {
    city: String,
    state: String,
    coordinates: Coordinates,
}

#[derive(Debug, Serialize)]
struct Coordinates {
    lat: f64,
    lon: f64,
}

async fn handler(
    Query(params): Query<InsightsQuery>,
    State(state): State<AppState>,
) -> Json<InsightsResponse> {
    // ---
    info!("GET /api/insights - {}, {}", params.city, params.state);

    let position = Position::new(params.lat, params.lon);
    let environment = match fetch_weather(&state.http, &state.config.weather_api_url, position).await
    {
        Ok(environment) => environment,
        Err(e) => {
            warn!("Weather fetch failed: {}", e);
            EnvironmentSnapshot::unavailable()
        }
    };

    let health_intelligence = simulated_health(&params.city, Utc::now().date_naive());

    Json(InsightsResponse {
        location: LocationEcho {
            city: params.city,
            state: params.state,
            coordinates: Coordinates {
                lat: params.lat,
                lon: params.lon,
            },
        },
        environment,
        health_intelligence,
    })
}
