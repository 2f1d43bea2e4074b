//! `GET /api/location`: coarse IP geolocation from edge-provided headers.
//!
//! The hosting edge (Vercel) annotates each request with the client's city,
//! region, country and coordinates. This endpoint echoes them back in a shape
//! the pipeline's IP-geolocation tier can consume directly.

use axum::{http::HeaderMap, routing::get, Json, Router};
use serde::Serialize;
use tracing::debug;

use super::AppState;

const CITY: &str = "x-vercel-ip-city";
const REGION: &str = "x-vercel-ip-country-region";
const COUNTRY: &str = "x-vercel-ip-country";
const LATITUDE: &str = "x-vercel-ip-latitude";
const LONGITUDE: &str = "x-vercel-ip-longitude";

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/location", get(handler))
}

#[derive(Debug, Serialize)]
struct LocationResponse {
    // ---
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    success: bool,
}

async fn handler(headers: HeaderMap) -> Json<LocationResponse> {
    // ---
    let response = from_headers(&headers);
    debug!("GET /api/location - {:?}", response);
    Json(response)
}

fn from_headers(headers: &HeaderMap) -> LocationResponse {
    // ---
    let city = header(headers, CITY);
    let latitude = header(headers, LATITUDE).and_then(|v| v.parse::<f64>().ok());
    let longitude = header(headers, LONGITUDE).and_then(|v| v.parse::<f64>().ok());
    let success = city.is_some() && latitude.is_some() && longitude.is_some();

    LocationResponse {
        city,
        region: header(headers, REGION),
        country: header(headers, COUNTRY),
        latitude,
        longitude,
        success,
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
