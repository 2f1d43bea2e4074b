//! In-process provider fixtures for integration tests.
//!
//! One axum server stands in for every external provider (IP lookup,
//! reverse geocoding, insights, weather, analysis). Replies are set per test
//! and every request's query string is recorded.
#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub type Params = HashMap<String, String>;

pub const INSIGHTS_FIXTURE: &str = r#"{
    "location": {"city": "Bengaluru", "state": "Karnataka"},
    "environment": {
        "temperature": "29°C",
        "condition": "Partly Cloudy",
        "humidity": "70%",
        "wind_speed": "12 km/h"
    },
    "health_intelligence": {
        "prevalent_diseases": ["Dengue"],
        "high_demand_medicines": ["Paracetamol"],
        "health_alert": "Monitor hydration"
    }
}"#;

pub struct Provider {
    // ---
    pub ip_body: Mutex<Value>,
    pub reverse_body: Mutex<Value>,
    pub insights_reply: Mutex<(StatusCode, String)>,
    pub weather_body: Mutex<Value>,
    pub forecast_reply: Mutex<(StatusCode, Value)>,
    pub regions_reply: Mutex<(StatusCode, Value)>,

    pub ip_hits: Mutex<usize>,
    pub reverse_queries: Mutex<Vec<Params>>,
    pub insights_queries: Mutex<Vec<Params>>,
}

impl Provider {
    /// Defaults reproduce the Bengaluru example end to end.
    pub fn bengaluru() -> Arc<Self> {
        // ---
        Arc::new(Self {
            ip_body: Mutex::new(json!({"latitude": 12.9716, "longitude": 77.5946})),
            reverse_body: Mutex::new(json!({
                "city": "Bengaluru",
                "principalSubdivision": "Karnataka",
                "countryName": "India"
            })),
            insights_reply: Mutex::new((StatusCode::OK, INSIGHTS_FIXTURE.to_string())),
            weather_body: Mutex::new(json!({"current": {
                "temperature_2m": 29.4,
                "relative_humidity_2m": 70,
                "weather_code": 2,
                "wind_speed_10m": 12.5
            }})),
            forecast_reply: Mutex::new((
                StatusCode::OK,
                json!({
                    "predictedDemand": 840.0,
                    "riskLevel": "MEDIUM",
                    "recommendation": "Stock ORS packets",
                    "reasoning": "Gastroenteritis reports rising",
                    "affectedRegion": "Karnataka",
                    "targetedMedicine": "ORS Packets"
                }),
            )),
            regions_reply: Mutex::new((
                StatusCode::OK,
                json!([
                    {"id": "KA", "name": "Karnataka", "risk": "MEDIUM", "activeCases": 320},
                    {"id": "KL", "name": "Kerala", "risk": "LOW", "activeCases": 45}
                ]),
            )),
            ip_hits: Mutex::new(0),
            reverse_queries: Mutex::new(Vec::new()),
            insights_queries: Mutex::new(Vec::new()),
        })
    }

    pub fn router(self: &Arc<Self>) -> Router {
        // ---
        Router::new()
            .route("/ip", get(ip))
            .route("/reverse", get(reverse))
            .route("/api/insights", get(insights))
            .route("/weather", get(weather))
            .route("/api/analysis/forecast", get(forecast))
            .route("/api/analysis/regions", get(regions))
            .with_state(self.clone())
    }
}

async fn ip(State(p): State<Arc<Provider>>) -> Json<Value> {
    *p.ip_hits.lock() += 1;
    Json(p.ip_body.lock().clone())
}

async fn reverse(State(p): State<Arc<Provider>>, Query(q): Query<Params>) -> Json<Value> {
    p.reverse_queries.lock().push(q);
    Json(p.reverse_body.lock().clone())
}

async fn insights(State(p): State<Arc<Provider>>, Query(q): Query<Params>) -> (StatusCode, String) {
    p.insights_queries.lock().push(q);
    p.insights_reply.lock().clone()
}

async fn weather(State(p): State<Arc<Provider>>) -> Json<Value> {
    Json(p.weather_body.lock().clone())
}

async fn forecast(State(p): State<Arc<Provider>>) -> (StatusCode, Json<Value>) {
    let (status, body) = p.forecast_reply.lock().clone();
    (status, Json(body))
}

async fn regions(State(p): State<Arc<Provider>>) -> (StatusCode, Json<Value>) {
    let (status, body) = p.regions_reply.lock().clone();
    (status, Json(body))
}

// ---

/// Serve `app` on an already-bound listener; returns its base URL.
pub fn serve_on(listener: TcpListener, app: Router) -> Result<String> {
    // ---
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(base)
}

pub async fn serve(app: Router) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    serve_on(listener, app)
}
