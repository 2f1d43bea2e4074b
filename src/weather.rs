//! Current weather from Open-Meteo, rendered as display strings.

use serde::Deserialize;
use tracing::debug;

use crate::models::{EnvironmentSnapshot, Position};

// ---

#[derive(Debug, Default, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    current: CurrentWeather,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentWeather {
    // ---
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    weather_code: Option<i64>,
    wind_speed_10m: Option<f64>,
}

/// Map a WMO weather code to a coarse condition label.
pub fn condition_for(code: i64) -> &'static str {
    // ---
    match code {
        1..=3 => "Partly Cloudy",
        45 | 48 => "Foggy",
        51 | 53 | 55 | 61 | 63 | 65 => "Rainy",
        c if c >= 80 => "Stormy",
        _ => "Clear",
    }
}

fn display(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v}{unit}"),
        None => "N/A".to_string(),
    }
}

impl CurrentWeather {
    fn to_snapshot(&self) -> EnvironmentSnapshot {
        // ---
        EnvironmentSnapshot {
            temperature: display(self.temperature_2m, "°C"),
            condition: condition_for(self.weather_code.unwrap_or(0)).to_string(),
            humidity: display(self.relative_humidity_2m, "%"),
            wind_speed: display(self.wind_speed_10m, " km/h"),
        }
    }
}

/// Fetch current conditions for `position` from an Open-Meteo compatible API.
pub async fn fetch_weather(
    client: &reqwest::Client,
    base_url: &str,
    position: Position,
) -> Result<EnvironmentSnapshot, reqwest::Error> {
    // ---
    debug!(
        "Fetching weather for ({}, {}) from {}",
        position.latitude, position.longitude, base_url
    );

    let response: OpenMeteoResponse = client
        .get(base_url)
        .query(&[
            ("latitude", position.latitude.to_string()),
            ("longitude", position.longitude.to_string()),
            (
                "current",
                "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m".to_string(),
            ),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response.current.to_snapshot())
}
