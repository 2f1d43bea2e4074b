//! Location-aware insights resolution and analysis orchestration.
//!
//! Two independent components drive what the MedSupply dashboard shows:
//! - [`LocationPipeline`]: device/IP position → locality → local insights,
//!   surfaced through a [`LocationStatus`] state machine.
//! - [`AnalysisRunner`]: a staged analysis run with timed progress lines and
//!   two concurrent data fetches (forecast, regional risk).
//!
//! The [`routes`] module exposes both over HTTP together with the insights
//! and IP-location endpoints the pipeline itself calls.

pub mod analysis;
pub mod config;
pub mod error;
pub mod geo;
pub mod health_trends;
pub mod insights;
pub mod locality;
pub mod models;
pub mod pipeline;
pub mod risk;
pub mod routes;
pub mod weather;

pub use analysis::{AnalysisBackend, AnalysisReport, AnalysisRunner, AnalysisStatus};
pub use config::Config;
pub use error::{AnalysisError, InsightsError, PositionError};
pub use geo::GeoPositionSource;
pub use insights::InsightsClient;
pub use locality::LocalityResolver;
pub use models::{
    AnalysisResult, EnvironmentSnapshot, HealthIntelligence, LocalInsights, Locality, LogEntry,
    Position, RegionStat, RiskLevel,
};
pub use pipeline::{LocationPipeline, LocationStatus};
pub use risk::{classify, RiskCategory};
