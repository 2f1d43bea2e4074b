//! Client for the locality insights backend (`GET /api/insights`).

use async_trait::async_trait;
use tracing::{debug, error};

use crate::{
    error::InsightsError,
    models::{LocalInsights, Locality, Position},
};

// ---

#[async_trait]
pub trait InsightsSource: Send + Sync {
    async fn fetch(
        &self,
        position: Position,
        locality: &Locality,
    ) -> Result<LocalInsights, InsightsError>;
}

/// One request per call, no internal retry.
#[derive(Debug, Clone)]
pub struct InsightsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl InsightsClient {
    /// `base_url` is the backend root; `/api/insights` is appended.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/insights", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InsightsSource for InsightsClient {
    async fn fetch(
        &self,
        position: Position,
        locality: &Locality,
    ) -> Result<LocalInsights, InsightsError> {
        // ---
        debug!(
            "Fetching insights for {}, {} from {}",
            locality.city, locality.region, self.endpoint
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", position.latitude.to_string()),
                ("lon", position.longitude.to_string()),
                ("city", locality.city.clone()),
                ("state", locality.region.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Insights backend returned {}", status);
            return Err(InsightsError::Http(status));
        }

        let body = response.text().await?;
        let insights: LocalInsights = serde_json::from_str(&body)?;
        Ok(insights)
    }
}
