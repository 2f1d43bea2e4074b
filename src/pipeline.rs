//! Location pipeline: position → locality → insights, with a visible status.
//!
//! Each call to [`LocationPipeline::resolve`] takes a new generation number.
//! Every status write and the final insights write check that generation
//! under the state lock, so a call superseded by a newer `resolve()` discards
//! its own completion instead of overwriting newer state. A call dropped
//! before it finishes leaves `Error` behind, never an in-progress status.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    geo::GeoPositionSource,
    insights::InsightsSource,
    locality::LocalitySource,
    models::{LocalInsights, Position},
};

// ---

pub const LOCATION_FAILED: &str = "Automatic location failed. Please retry.";
pub const INSIGHTS_FAILED: &str = "Failed to fetch local insights.";
pub const LOCALITY_UNRESOLVED: &str = "Could not determine locality";
pub const RESOLUTION_CANCELLED: &str = "Location resolution was cancelled. Please retry.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LocationStatus {
    Idle,
    Detecting,
    ResolvingViaDevice,
    ResolvingViaNetwork,
    FetchingInsights,
    Active,
    /// A position was found but no usable city name; insights were skipped.
    LocalityUnresolved,
    Error(String),
}

impl LocationStatus {
    /// `Active`, `LocalityUnresolved` and `Error` end a resolution.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LocationStatus::Active | LocationStatus::LocalityUnresolved | LocationStatus::Error(_)
        )
    }

    /// User-facing message for the non-success terminal states.
    pub fn message(&self) -> Option<&str> {
        match self {
            LocationStatus::Error(message) => Some(message),
            LocationStatus::LocalityUnresolved => Some(LOCALITY_UNRESOLVED),
            _ => None,
        }
    }
}

/// Snapshot of what a caller renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSnapshot {
    pub status: LocationStatus,
    pub insights: Option<LocalInsights>,
}

#[derive(Debug, Default)]
struct PipelineState {
    generation: u64,
    insights: Option<LocalInsights>,
}

pub struct LocationPipeline {
    // ---
    positions: GeoPositionSource,
    localities: Arc<dyn LocalitySource>,
    insights: Arc<dyn InsightsSource>,
    state: Mutex<PipelineState>,
    status: watch::Sender<LocationStatus>,
}

impl LocationPipeline {
    pub fn new(
        positions: GeoPositionSource,
        localities: Arc<dyn LocalitySource>,
        insights: Arc<dyn InsightsSource>,
    ) -> Self {
        // ---
        let (status, _) = watch::channel(LocationStatus::Idle);
        Self {
            positions,
            localities,
            insights,
            state: Mutex::new(PipelineState::default()),
            status,
        }
    }

    pub fn current_status(&self) -> LocationStatus {
        self.status.borrow().clone()
    }

    /// Last successfully fetched insights. Kept across later failures.
    pub fn current_insights(&self) -> Option<LocalInsights> {
        self.state.lock().insights.clone()
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        // ---
        let state = self.state.lock();
        LocationSnapshot {
            status: self.status.borrow().clone(),
            insights: state.insights.clone(),
        }
    }

    /// Observe every status transition.
    pub fn subscribe(&self) -> watch::Receiver<LocationStatus> {
        self.status.subscribe()
    }

    /// Run one resolution. Safe to call from any state, including while an
    /// earlier call is still in flight; the earlier call then goes quiet.
    pub async fn resolve(&self) {
        // ---
        let generation = self.begin();
        let _guard = Unfinished {
            pipeline: self,
            generation,
        };

        let Some(position) = self.acquire_position(generation).await else {
            return;
        };

        let locality = self.localities.resolve_locality(position).await;
        if !locality.is_resolved() {
            warn!("No usable locality for ({}, {})", position.latitude, position.longitude);
            self.transition(generation, LocationStatus::LocalityUnresolved);
            return;
        }

        if !self.transition(generation, LocationStatus::FetchingInsights) {
            return;
        }

        match self.insights.fetch(position, &locality).await {
            Ok(insights) => {
                if self.publish(generation, insights) {
                    info!("Insights active for {}, {}", locality.city, locality.region);
                }
            }
            Err(e) => {
                error!("Insights fetch for {} failed: {}", locality.city, e);
                self.transition(generation, LocationStatus::Error(INSIGHTS_FAILED.to_string()));
            }
        }
    }

    /// Device first; on any device failure fall back silently to the network.
    async fn acquire_position(&self, generation: u64) -> Option<Position> {
        // ---
        match self.positions.device_position().await {
            Ok(position) => {
                self.transition(generation, LocationStatus::ResolvingViaDevice)
                    .then_some(position)
            }
            Err(device_err) => {
                debug!("Device positioning failed ({}), trying network", device_err);
                if !self.transition(generation, LocationStatus::ResolvingViaNetwork) {
                    return None;
                }

                match self.positions.network_position().await {
                    Ok(position) => self.is_current(generation).then_some(position),
                    Err(network_err) => {
                        error!("Network positioning failed: {}", network_err);
                        self.transition(generation, LocationStatus::Error(LOCATION_FAILED.to_string()));
                        None
                    }
                }
            }
        }
    }

    fn begin(&self) -> u64 {
        // ---
        let mut state = self.state.lock();
        state.generation += 1;
        self.status.send_replace(LocationStatus::Detecting);
        debug!("Location resolution #{} started", state.generation);
        state.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    /// Write `status` if `generation` is still the newest call.
    fn transition(&self, generation: u64, status: LocationStatus) -> bool {
        // ---
        let state = self.state.lock();
        if state.generation != generation {
            debug!(
                "Dropping {:?} from superseded resolution #{} (current #{})",
                status, generation, state.generation
            );
            return false;
        }
        debug!("Location status -> {:?}", status);
        self.status.send_replace(status);
        true
    }

    fn publish(&self, generation: u64, insights: LocalInsights) -> bool {
        // ---
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Dropping insights from superseded resolution #{}", generation);
            return false;
        }
        state.insights = Some(insights);
        self.status.send_replace(LocationStatus::Active);
        true
    }
}

/// Lives for one `resolve()` call. If the call is dropped while it is still
/// the current one and has not reached a terminal status, writes `Error`.
struct Unfinished<'a> {
    pipeline: &'a LocationPipeline,
    generation: u64,
}

impl Drop for Unfinished<'_> {
    fn drop(&mut self) {
        // ---
        let state = self.pipeline.state.lock();
        if state.generation != self.generation {
            return;
        }
        let in_progress = !self.pipeline.status.borrow().is_terminal();
        if in_progress {
            warn!("Location resolution #{} dropped before completion", self.generation);
            self.pipeline
                .status
                .send_replace(LocationStatus::Error(RESOLUTION_CANCELLED.to_string()));
        }
    }
}
