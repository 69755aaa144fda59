//! Per-sample fishing score
//!
//! Every sample starts at the midpoint of the 0-10 scale and each factor adds
//! a bounded contribution. Missing signals contribute nothing.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    finite, DayContext, EnvironmentalSample, FactorBreakdown, ScoredSample, Species, TideState,
};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Thresholds and weights for one species
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringThresholds {
    pub baseline: f64,
    /// Full temperature credit inside this band (°C)
    pub optimal_temperature_c: (f64, f64),
    /// Partial temperature credit inside this wider band (°C)
    pub acceptable_temperature_c: (f64, f64),
    pub temperature_bonus: f64,
    pub temperature_partial_bonus: f64,
    /// No wind penalty at or below this speed (km/h)
    pub calm_wind_kmh: f64,
    /// Partial penalty at or below this speed, full penalty above
    pub breezy_wind_kmh: f64,
    pub breezy_wind_penalty: f64,
    pub strong_wind_penalty: f64,
    /// Stable barometric band (hPa)
    pub stable_pressure_hpa: (f64, f64),
    pub pressure_bonus: f64,
    /// Distance from sunrise/sunset that still counts as low light
    pub low_light_window_minutes: i64,
    pub low_light_bonus: f64,
    pub moderate_rain_mm: f64,
    pub moderate_rain_penalty: f64,
    pub heavy_rain_mm: f64,
    pub heavy_rain_penalty: f64,
    pub cloud_cover_percent: (f64, f64),
    pub cloud_cover_bonus: f64,
    pub moving_tide_bonus: f64,
    /// Time before a tide turn that earns the change bonus
    pub tide_change_window_minutes: i64,
    pub tide_change_bonus: f64,
    pub tide_weight: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            baseline: 5.0,
            optimal_temperature_c: (15.0, 25.0),
            acceptable_temperature_c: (10.0, 30.0),
            temperature_bonus: 1.5,
            temperature_partial_bonus: 0.75,
            calm_wind_kmh: 15.0,
            breezy_wind_kmh: 25.0,
            breezy_wind_penalty: -1.0,
            strong_wind_penalty: -2.5,
            stable_pressure_hpa: (1010.0, 1025.0),
            pressure_bonus: 1.0,
            low_light_window_minutes: 120,
            low_light_bonus: 1.5,
            moderate_rain_mm: 2.0,
            moderate_rain_penalty: -0.5,
            heavy_rain_mm: 5.0,
            heavy_rain_penalty: -1.0,
            cloud_cover_percent: (30.0, 80.0),
            cloud_cover_bonus: 0.5,
            moving_tide_bonus: 1.0,
            tide_change_window_minutes: 60,
            tide_change_bonus: 0.5,
            tide_weight: 1.0,
        }
    }
}

impl ScoringThresholds {
    pub fn for_species(species: Species) -> Self {
        let general = Self::default();
        match species {
            Species::General => general,
            Species::Bass => Self {
                optimal_temperature_c: (18.0, 27.0),
                acceptable_temperature_c: (13.0, 31.0),
                calm_wind_kmh: 12.0,
                ..general
            },
            Species::Trout => Self {
                optimal_temperature_c: (10.0, 18.0),
                acceptable_temperature_c: (5.0, 22.0),
                cloud_cover_bonus: 0.75,
                ..general
            },
            Species::Saltwater => Self {
                optimal_temperature_c: (16.0, 26.0),
                acceptable_temperature_c: (10.0, 30.0),
                calm_wind_kmh: 18.0,
                breezy_wind_kmh: 30.0,
                tide_weight: 1.5,
                ..general
            },
        }
    }
}

/// Total score and its factor breakdown
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub total: f64,
    pub factors: FactorBreakdown,
}

/// Stateless scorer parameterised by species thresholds
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    thresholds: ScoringThresholds,
}

fn in_band(value: f64, band: (f64, f64)) -> bool {
    value >= band.0 && value <= band.1
}

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    }
}

impl Scorer {
    pub fn new(species: Species) -> Self {
        Self::with_thresholds(ScoringThresholds::for_species(species))
    }

    pub fn with_thresholds(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    /// Score one sample
    pub fn score(
        &self,
        sample: &EnvironmentalSample,
        day: Option<&DayContext>,
        tide: Option<&TideState>,
    ) -> ScoreResult {
        let factors = FactorBreakdown {
            baseline: self.thresholds.baseline,
            temperature: self.temperature_factor(finite(sample.temperature_c)),
            wind: self.wind_factor(finite(sample.wind_speed_kmh)),
            pressure: self.pressure_factor(finite(sample.pressure_hpa)),
            time_of_day: self.time_of_day_factor(sample.timestamp, day),
            precipitation: self.precipitation_factor(finite(sample.precipitation_mm)),
            cloud_cover: self.cloud_cover_factor(finite(sample.cloud_cover_percent)),
            tide: tide
                .filter(|t| !t.is_empty())
                .map(|t| self.tide_factor(sample.timestamp, t)),
        };

        ScoreResult {
            total: clamp_score(factors.raw_total()),
            factors,
        }
    }

    /// Score one sample and attach its weather description
    pub fn score_sample(
        &self,
        sample: &EnvironmentalSample,
        day: Option<&DayContext>,
        tide: Option<&TideState>,
    ) -> ScoredSample {
        let result = self.score(sample, day, tide);
        ScoredSample {
            sample: sample.clone(),
            score: result.total,
            factors: result.factors,
            description: describe(sample),
        }
    }

    /// Score a horizon, matching each sample to the context of its UTC date
    pub fn score_series(
        &self,
        samples: &[EnvironmentalSample],
        days: &[DayContext],
        tide: Option<&TideState>,
    ) -> Vec<ScoredSample> {
        let by_date: HashMap<NaiveDate, &DayContext> = days.iter().map(|d| (d.date, d)).collect();

        samples
            .iter()
            .map(|s| self.score_sample(s, by_date.get(&s.date()).copied(), tide))
            .collect()
    }

    fn temperature_factor(&self, temperature: Option<f64>) -> f64 {
        let t = &self.thresholds;
        match temperature {
            Some(v) if in_band(v, t.optimal_temperature_c) => t.temperature_bonus,
            Some(v) if in_band(v, t.acceptable_temperature_c) => t.temperature_partial_bonus,
            _ => 0.0,
        }
    }

    fn wind_factor(&self, speed: Option<f64>) -> f64 {
        let t = &self.thresholds;
        match speed {
            Some(v) if v <= t.calm_wind_kmh => 0.0,
            Some(v) if v <= t.breezy_wind_kmh => t.breezy_wind_penalty,
            Some(_) => t.strong_wind_penalty,
            None => 0.0,
        }
    }

    fn pressure_factor(&self, pressure: Option<f64>) -> f64 {
        match pressure {
            Some(v) if in_band(v, self.thresholds.stable_pressure_hpa) => {
                self.thresholds.pressure_bonus
            }
            _ => 0.0,
        }
    }

    fn time_of_day_factor(&self, at: DateTime<Utc>, day: Option<&DayContext>) -> f64 {
        let Some(day) = day else {
            return 0.0;
        };
        let window = Duration::minutes(self.thresholds.low_light_window_minutes);
        let near = |event: Option<DateTime<Utc>>| {
            event.is_some_and(|e| (at - e).abs() <= window)
        };

        if near(day.sunrise) || near(day.sunset) {
            self.thresholds.low_light_bonus
        } else {
            0.0
        }
    }

    fn precipitation_factor(&self, precipitation: Option<f64>) -> f64 {
        let t = &self.thresholds;
        match precipitation {
            Some(v) if v > t.heavy_rain_mm => t.heavy_rain_penalty,
            Some(v) if v > t.moderate_rain_mm => t.moderate_rain_penalty,
            _ => 0.0,
        }
    }

    fn cloud_cover_factor(&self, cloud_cover: Option<f64>) -> f64 {
        match cloud_cover {
            Some(v) if in_band(v, self.thresholds.cloud_cover_percent) => {
                self.thresholds.cloud_cover_bonus
            }
            _ => 0.0,
        }
    }

    fn tide_factor(&self, at: DateTime<Utc>, tide: &TideState) -> f64 {
        let t = &self.thresholds;
        let mut factor = 0.0;

        if tide.phase_at(at).is_some_and(|p| p.is_moving()) {
            factor += t.moving_tide_bonus;
        }
        if let Some(until_change) = tide.time_to_next_event(at) {
            if until_change <= Duration::minutes(t.tide_change_window_minutes) {
                factor += t.tide_change_bonus;
            }
        }

        factor * t.tide_weight
    }
}

/// Short human-readable weather description for a sample
pub fn describe(sample: &EnvironmentalSample) -> String {
    let precipitation = finite(sample.precipitation_mm).unwrap_or(0.0);
    let cape = finite(sample.cape_j_kg).unwrap_or(0.0);

    let description = if cape > 1000.0 && precipitation > 0.0 {
        "Thunderstorm risk"
    } else if precipitation >= 2.5 {
        "Rain"
    } else if precipitation > 0.1 {
        "Light rain"
    } else if finite(sample.visibility_m).is_some_and(|v| v < 1000.0) {
        "Fog"
    } else {
        match finite(sample.cloud_cover_percent) {
            Some(c) if c >= 85.0 => "Overcast",
            Some(c) if c >= 40.0 => "Partly cloudy",
            Some(_) => "Clear",
            None => "Fair",
        }
    };
    description.to_string()
}
