//! Environmental sample models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One weather sample at a fixed cadence
///
/// Every signal is optional: upstream feeds drop fields, and a missing field
/// is scored as neutral rather than as a bad reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalSample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub apparent_temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity_percent: Option<f64>,
    #[serde(default)]
    pub dew_point_c: Option<f64>,
    #[serde(default)]
    pub precipitation_mm: Option<f64>,
    #[serde(default)]
    pub pressure_hpa: Option<f64>,
    #[serde(default)]
    pub cloud_cover_percent: Option<f64>,
    #[serde(default)]
    pub wind_speed_kmh: Option<f64>,
    #[serde(default)]
    pub wind_direction_deg: Option<f64>,
    #[serde(default)]
    pub wind_gusts_kmh: Option<f64>,
    #[serde(default)]
    pub visibility_m: Option<f64>,
    #[serde(default)]
    pub sunshine_duration_s: Option<f64>,
    /// Convective available potential energy (J/kg)
    #[serde(default)]
    pub cape_j_kg: Option<f64>,
}

impl EnvironmentalSample {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Per-day astronomical and temperature context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayContext {
    pub date: NaiveDate,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub temperature_min_c: Option<f64>,
    pub temperature_max_c: Option<f64>,
}

impl DayContext {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            sunrise: None,
            sunset: None,
            temperature_min_c: None,
            temperature_max_c: None,
        }
    }
}

/// Discard NaN/infinite readings so they score as missing
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
