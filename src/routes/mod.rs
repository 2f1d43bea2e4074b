//! Route gateway: merges every endpoint subrouter and owns the shared state.
//!
//! `main.rs` only sees [`AppState::from_config`] and [`router`]; individual
//! endpoints live in sibling modules (EMBP).

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

use crate::{
    analysis::{AnalysisBackend, AnalysisRunner, HttpAnalysisBackend, SimulatedAnalysisBackend},
    geo::{DevicePositioner, FixedDevicePositioner, GeoPositionSource, IpGeolocator, NoDevicePositioner},
    insights::InsightsClient,
    locality::LocalityResolver,
    pipeline::LocationPipeline,
    Config,
};

mod analysis;
mod health;
mod insights;
mod location;
mod pipeline;

// ---

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub config: Config,
    pub http: reqwest::Client,
    pub pipeline: Arc<LocationPipeline>,
    pub analysis: Arc<AnalysisRunner>,
}

impl AppState {
    /// Wire the pipeline and runner to the providers named in `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        // ---
        let http = config.http_client()?;

        let device: Arc<dyn DevicePositioner> = match config.device_position {
            Some(position) => Arc::new(FixedDevicePositioner::new(position)),
            None => Arc::new(NoDevicePositioner),
        };
        let network = Arc::new(IpGeolocator::new(http.clone(), &config.ip_geolocation_url));
        let positions =
            GeoPositionSource::new(device, network).with_device_timeout(config.device_timeout);

        let pipeline = LocationPipeline::new(
            positions,
            Arc::new(LocalityResolver::new(http.clone(), &config.reverse_geocode_url)),
            Arc::new(InsightsClient::new(http.clone(), &config.insights_api_url)),
        );

        let backend: Arc<dyn AnalysisBackend> = match &config.analysis_api_url {
            Some(url) => Arc::new(HttpAnalysisBackend::new(http.clone(), url)),
            None => Arc::new(SimulatedAnalysisBackend::default()),
        };
        let analysis = AnalysisRunner::new(backend, config.reasoning_model.clone());

        Ok(Self {
            config,
            http,
            pipeline: Arc::new(pipeline),
            analysis: Arc::new(analysis),
        })
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(location::router())
        .merge(insights::router())
        .merge(pipeline::router())
        .merge(analysis::router())
        .merge(health::router())
        .with_state(state)
}
