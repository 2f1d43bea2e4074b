//! Two-tier position source: device positioning first, IP geolocation second.
//!
//! The device tier is bounded by a timeout; the network tier is a single GET
//! to an IP-geolocation provider. Which tier to use, and when to fall back, is
//! decided by [`LocationPipeline`](crate::LocationPipeline).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{error::PositionError, models::Position};

// ---

/// Options passed to the device positioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    // ---
    pub high_accuracy: bool,

    /// Oldest acceptable cached fix. Zero means a fresh fix is required.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Device-level positioning (GPS, OS location service, ...).
#[async_trait]
pub trait DevicePositioner: Send + Sync {
    async fn current_position(&self, options: PositionOptions) -> Result<Position, PositionError>;
}

/// Network-address-based position estimation.
#[async_trait]
pub trait NetworkLocator: Send + Sync {
    async fn locate(&self) -> Result<Position, PositionError>;
}

// ---

/// Host without any device positioning capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDevicePositioner;

#[async_trait]
impl DevicePositioner for NoDevicePositioner {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, PositionError> {
        Err(PositionError::Unavailable)
    }
}

/// Host with a known, fixed position (configured coordinates).
#[derive(Debug, Clone, Copy)]
pub struct FixedDevicePositioner {
    position: Position,
}

impl FixedDevicePositioner {
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

#[async_trait]
impl DevicePositioner for FixedDevicePositioner {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, PositionError> {
        Ok(self.position)
    }
}

// ---

/// IP-geolocation lookup over HTTP.
///
/// Expects a JSON object with `latitude` and `longitude`. Numbers are taken
/// as-is; numeric strings are accepted too since some providers quote them.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: reqwest::Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NetworkLocator for IpGeolocator {
    async fn locate(&self) -> Result<Position, PositionError> {
        // ---
        debug!("Requesting IP geolocation from: {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(PositionError::Http(response.status()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PositionError::InvalidResponse(e.to_string()))?;

        position_from_json(&body)
    }
}

/// Extract a position from an IP-geolocation response body.
pub fn position_from_json(body: &Value) -> Result<Position, PositionError> {
    // ---
    let latitude = coordinate(body, "latitude")?;
    let longitude = coordinate(body, "longitude")?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(PositionError::InvalidResponse(format!(
            "coordinates out of range: ({latitude}, {longitude})"
        )));
    }

    Ok(Position::new(latitude, longitude))
}

fn coordinate(body: &Value, field: &str) -> Result<f64, PositionError> {
    // ---
    let value = match body.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| PositionError::InvalidResponse(format!("`{field}` missing or non-numeric")))
}

// ---

/// Device tier with a timeout, plus the network tier.
#[derive(Clone)]
pub struct GeoPositionSource {
    device: Arc<dyn DevicePositioner>,
    network: Arc<dyn NetworkLocator>,
    device_timeout: Duration,
}

impl GeoPositionSource {
    pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(device: Arc<dyn DevicePositioner>, network: Arc<dyn NetworkLocator>) -> Self {
        Self {
            device,
            network,
            device_timeout: Self::DEFAULT_DEVICE_TIMEOUT,
        }
    }

    pub fn with_device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout = timeout;
        self
    }

    /// High-accuracy device fix, no cached fixes, bounded by the timeout.
    pub async fn device_position(&self) -> Result<Position, PositionError> {
        // ---
        let options = PositionOptions::default();
        match tokio::time::timeout(self.device_timeout, self.device.current_position(options)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("No device fix within {:?}", self.device_timeout);
                Err(PositionError::Timeout(self.device_timeout))
            }
        }
    }

    pub async fn network_position(&self) -> Result<Position, PositionError> {
        self.network.locate().await
    }
}
