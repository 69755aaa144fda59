//! Fishing score and forecast summary models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::conditions::EnvironmentalSample;

/// Target species; each variant re-weights the scoring thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    #[default]
    General,
    Bass,
    Trout,
    Saltwater,
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Species::General => write!(f, "general"),
            Species::Bass => write!(f, "bass"),
            Species::Trout => write!(f, "trout"),
            Species::Saltwater => write!(f, "saltwater"),
        }
    }
}

impl std::str::FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Ok(Species::General),
            "bass" => Ok(Species::Bass),
            "trout" => Ok(Species::Trout),
            "saltwater" => Ok(Species::Saltwater),
            other => Err(format!("unknown species: {}", other)),
        }
    }
}

/// Contribution of each factor to a sample's score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct FactorBreakdown {
    pub baseline: f64,
    pub temperature: f64,
    pub wind: f64,
    pub pressure: f64,
    pub time_of_day: f64,
    pub precipitation: f64,
    pub cloud_cover: f64,
    /// `None` when no tide data was supplied
    pub tide: Option<f64>,
}

impl FactorBreakdown {
    /// Baseline plus every weather factor, excluding tide
    pub fn weather_subtotal(&self) -> f64 {
        self.baseline
            + self.temperature
            + self.wind
            + self.pressure
            + self.time_of_day
            + self.precipitation
            + self.cloud_cover
    }

    pub fn raw_total(&self) -> f64 {
        self.weather_subtotal() + self.tide.unwrap_or(0.0)
    }
}

/// A sample together with its score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredSample {
    pub sample: EnvironmentalSample,
    /// Score in [0, 10]
    pub score: f64,
    pub factors: FactorBreakdown,
    pub description: String,
}

/// Aggregate of a fixed-size block of consecutive samples
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sample_count: usize,
    /// Mean of the constituent sample scores
    pub score: f64,
    pub mean_temperature_c: Option<f64>,
    pub mean_wind_speed_kmh: Option<f64>,
    pub mean_wind_gusts_kmh: Option<f64>,
    pub mean_pressure_hpa: Option<f64>,
    pub mean_precipitation_mm: Option<f64>,
    pub mean_cloud_cover_percent: Option<f64>,
    pub mean_humidity_percent: Option<f64>,
    pub description: String,
}

/// All windows of one day plus the best of them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub best_window: Option<WindowSummary>,
    pub windows: Vec<WindowSummary>,
    pub samples: Vec<ScoredSample>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

impl DaySummary {
    /// Best window score, `None` when the day has no complete window
    pub fn best_score(&self) -> Option<f64> {
        self.best_window.as_ref().map(|w| w.score)
    }
}
