//! Reverse geocoding of a [`Position`] into a [`Locality`].
//!
//! Never fails outward: transport and parse errors collapse into
//! [`Locality::unknown`], and missing fields walk a fixed fallback chain.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{Locality, Position};

// ---

#[async_trait]
pub trait LocalitySource: Send + Sync {
    async fn resolve_locality(&self, position: Position) -> Locality;
}

/// Reverse-geocode response. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseGeocode {
    // ---
    pub city: Option<String>,
    pub locality: Option<String>,
    pub principal_subdivision: Option<String>,
    pub country_name: Option<String>,
}

impl ReverseGeocode {
    /// City: `city → locality → principalSubdivision → "Unknown Location"`.
    /// Region: `principalSubdivision → countryName → ""`.
    pub fn to_locality(&self) -> Locality {
        // ---
        let city = first_non_empty([&self.city, &self.locality, &self.principal_subdivision])
            .unwrap_or(Locality::UNKNOWN_LOCATION);
        let region =
            first_non_empty([&self.principal_subdivision, &self.country_name]).unwrap_or("");

        Locality::new(city, region)
    }
}

fn first_non_empty<const N: usize>(candidates: [&Option<String>; N]) -> Option<&str> {
    candidates
        .into_iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|c| !c.is_empty())
}

// ---

/// HTTP reverse-geocoding client.
#[derive(Debug, Clone)]
pub struct LocalityResolver {
    client: reqwest::Client,
    url: String,
}

impl LocalityResolver {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn lookup(&self, position: Position) -> Result<ReverseGeocode, reqwest::Error> {
        // ---
        self.client
            .get(&self.url)
            .query(&[
                ("latitude", position.latitude.to_string()),
                ("longitude", position.longitude.to_string()),
                ("localityLanguage", "en".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl LocalitySource for LocalityResolver {
    async fn resolve_locality(&self, position: Position) -> Locality {
        // ---
        debug!(
            "Reverse geocoding ({}, {})",
            position.latitude, position.longitude
        );

        match self.lookup(position).await {
            Ok(geocode) => {
                let locality = geocode.to_locality();
                debug!("Resolved locality: {:?}", locality);
                locality
            }
            Err(e) => {
                warn!("Reverse geocoding failed: {}", e);
                Locality::unknown()
            }
        }
    }
}
