//! Data models shared by the location pipeline and the analysis runner.
//!
//! Wire names follow the insights backend (`location.state`,
//! `health_intelligence.*`) and the analysis backend (camelCase), so the same
//! types decode client responses and encode the hosted endpoints' bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    // ---
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Human-readable city/region label derived from a [`Position`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    // ---
    pub city: String,

    /// State or region; serialized as `state` on the insights wire format.
    #[serde(rename = "state", default)]
    pub region: String,
}

impl Locality {
    // ---
    /// City label used when no name could be resolved at all.
    pub const UNKNOWN_CITY: &'static str = "Unknown";

    /// Last-resort city label from the reverse-geocode field chain.
    pub const UNKNOWN_LOCATION: &'static str = "Unknown Location";

    pub fn new(city: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            region: region.into(),
        }
    }

    /// `{city: "Unknown", region: ""}`
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_CITY, "")
    }

    /// True when the city is a real name that insights can be fetched for.
    pub fn is_resolved(&self) -> bool {
        let city = self.city.trim();
        !city.is_empty() && city != Self::UNKNOWN_CITY && city != Self::UNKNOWN_LOCATION
    }
}

/// Free-form weather display strings from the insights backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    // ---
    pub temperature: String,
    pub condition: String,
    pub humidity: String,
    pub wind_speed: String,
}

impl EnvironmentSnapshot {
    /// Placeholder used when the weather provider could not be reached.
    pub fn unavailable() -> Self {
        let na = || "N/A".to_string();
        Self {
            temperature: na(),
            condition: na(),
            humidity: na(),
            wind_speed: na(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthIntelligence {
    // ---
    pub prevalent_diseases: Vec<String>,
    pub health_alert: String,
    pub high_demand_medicines: Vec<String>,
}

/// Terminal artifact of the location pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalInsights {
    // ---
    pub location: Locality,
    pub environment: EnvironmentSnapshot,

    #[serde(rename = "health_intelligence")]
    pub health: HealthIntelligence,
}

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Demand forecast produced by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    // ---
    pub predicted_demand: f64,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    pub reasoning: String,
    pub affected_region: String,
    pub targeted_medicine: String,
}

impl AnalysisResult {
    /// Three-day demand series for charting: the forecast is Friday's
    /// baseline, followed by +10% and -10% days.
    pub fn demand_projection(&self) -> [(&'static str, f64); 3] {
        // ---
        let base = self.predicted_demand;
        [
            ("Friday", base),
            ("Saturday", base * 1.1),
            ("Sunday", base * 0.9),
        ]
    }
}

/// Per-region risk for the current analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStat {
    // ---
    pub id: String,
    pub name: String,
    pub risk: RiskLevel,
    pub active_cases: u32,
}

/// One progress line of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    // ---
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}
