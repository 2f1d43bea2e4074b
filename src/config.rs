//! Configuration loader for the `medsupply-insights` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Provider URLs, timeouts and the analysis backend
//! selection all live here so the pipeline modules never read `env::var`.
//!
use std::{env, net::SocketAddr, time::Duration};

use anyhow::{anyhow, bail, Result};

use crate::models::Position;

/// Parse an optional environment variable into `Option<$ty>`.
macro_rules! parse_env_opt {
    ($var_name:expr, $ty:ty) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
    };
}

/// Parse an optional environment variable into `$ty`, with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        parse_env_opt!($var_name, $ty).unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

pub const DEFAULT_IP_GEOLOCATION_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_REVERSE_GEOCODE_URL: &str =
    "https://api.bigdatacloud.net/data/reverse-geocode-client";
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_REASONING_MODEL: &str = "Gemini 1.5 Flash";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Address the HTTP service listens on.
    pub bind_addr: SocketAddr,

    /// IP-geolocation provider (network position tier).
    pub ip_geolocation_url: String,

    /// Reverse-geocoding provider.
    pub reverse_geocode_url: String,

    /// Base URL of the insights backend; `/api/insights` is appended.
    pub insights_api_url: String,

    /// Base URL of a real analysis backend. `None` selects the simulated one.
    pub analysis_api_url: Option<String>,

    /// Weather provider used by the hosted `/api/insights` endpoint.
    pub weather_api_url: String,

    /// How long to wait for a device fix before falling back.
    pub device_timeout: Duration,

    /// Deadline applied to every outbound HTTP request.
    pub http_timeout: Duration,

    /// Model name shown in the analysis progress log.
    pub reasoning_model: String,

    /// Fixed device coordinates, when the host has a known position.
    pub device_position: Option<Position>,
}

impl Default for Config {
    fn default() -> Self {
        // ---
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            ip_geolocation_url: DEFAULT_IP_GEOLOCATION_URL.to_string(),
            reverse_geocode_url: DEFAULT_REVERSE_GEOCODE_URL.to_string(),
            insights_api_url: "http://localhost:8080".to_string(),
            analysis_api_url: None,
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
            device_timeout: Duration::from_millis(5000),
            http_timeout: Duration::from_secs(10),
            reasoning_model: DEFAULT_REASONING_MODEL.to_string(),
            device_position: None,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
/// - `IP_GEOLOCATION_URL`, `REVERSE_GEOCODE_URL`, `WEATHER_API_URL` – provider URLs
/// - `INSIGHTS_API_URL` – insights backend base URL (default: `http://localhost:8080`)
/// - `ANALYSIS_API_URL` – analysis backend base URL (default: simulated backend)
/// - `DEVICE_TIMEOUT_MS` – device fix timeout (default: 5000)
/// - `HTTP_TIMEOUT_SECS` – outbound request deadline (default: 10)
/// - `REASONING_MODEL` – model name for the progress log
/// - `DEVICE_LATITUDE` / `DEVICE_LONGITUDE` – fixed device position, both or neither
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let bind_addr = parse_env!("BIND_ADDR", SocketAddr, defaults.bind_addr);
    let device_timeout_ms = parse_env!("DEVICE_TIMEOUT_MS", u64, 5000);
    let http_timeout_secs = parse_env!("HTTP_TIMEOUT_SECS", u64, 10);

    let device_lat = parse_env_opt!("DEVICE_LATITUDE", f64);
    let device_lon = parse_env_opt!("DEVICE_LONGITUDE", f64);
    let device_position = device_position_from(device_lat, device_lon)?;

    let analysis_api_url = env::var("ANALYSIS_API_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    Ok(Config {
        bind_addr,
        ip_geolocation_url: env_or!("IP_GEOLOCATION_URL", DEFAULT_IP_GEOLOCATION_URL),
        reverse_geocode_url: env_or!("REVERSE_GEOCODE_URL", DEFAULT_REVERSE_GEOCODE_URL),
        insights_api_url: env_or!("INSIGHTS_API_URL", defaults.insights_api_url),
        analysis_api_url,
        weather_api_url: env_or!("WEATHER_API_URL", DEFAULT_WEATHER_API_URL),
        device_timeout: Duration::from_millis(device_timeout_ms),
        http_timeout: Duration::from_secs(http_timeout_secs),
        reasoning_model: env_or!("REASONING_MODEL", DEFAULT_REASONING_MODEL),
        device_position,
    })
}

/// Both coordinates or neither. `NaN` and infinities fail the range check.
fn device_position_from(lat: Option<f64>, lon: Option<f64>) -> Result<Option<Position>> {
    // ---
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                bail!("DEVICE_LATITUDE/DEVICE_LONGITUDE out of range: ({lat}, {lon})");
            }
            Ok(Some(Position::new(lat, lon)))
        }
        _ => bail!("DEVICE_LATITUDE and DEVICE_LONGITUDE must be set together"),
    }
}

impl Config {
    /// Build the shared outbound HTTP client with the configured deadline.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        // ---
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  BIND_ADDR          : {}", self.bind_addr);
        tracing::info!("  IP_GEOLOCATION_URL : {}", self.ip_geolocation_url);
        tracing::info!("  REVERSE_GEOCODE_URL: {}", self.reverse_geocode_url);
        tracing::info!("  INSIGHTS_API_URL   : {}", self.insights_api_url);
        tracing::info!(
            "  ANALYSIS_API_URL   : {}",
            self.analysis_api_url.as_deref().unwrap_or("(simulated)")
        );
        tracing::info!("  WEATHER_API_URL    : {}", self.weather_api_url);
        tracing::info!("  DEVICE_TIMEOUT     : {:?}", self.device_timeout);
        tracing::info!("  HTTP_TIMEOUT       : {:?}", self.http_timeout);
        tracing::info!("  REASONING_MODEL    : {}", self.reasoning_model);
        match self.device_position {
            Some(p) => tracing::info!("  DEVICE_POSITION    : ({}, {})", p.latitude, p.longitude),
            None => tracing::info!("  DEVICE_POSITION    : (none)"),
        }
    }
}
