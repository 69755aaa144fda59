//! Point-in-time condition snapshots built from a fetched horizon

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    finite, ConditionSnapshot, DayContext, EnvironmentalSample, PressureTrend, Species, TideState,
};
use crate::scoring::Scorer;
use crate::solunar::solunar_period_at;
use crate::types::GpsCoordinates;

/// Look-back used for the barometric trend
pub const PRESSURE_TREND_HOURS: i64 = 3;
/// Change (hPa) over the look-back that counts as rising or falling
pub const PRESSURE_TREND_THRESHOLD_HPA: f64 = 1.0;
/// Reach of a lone sample, when no cadence can be measured
pub const SINGLE_SAMPLE_REACH_MINUTES: i64 = 60;

/// Everything a condition source returns for one location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Conditions {
    pub samples: Vec<EnvironmentalSample>,
    pub days: Vec<DayContext>,
    #[serde(default)]
    pub tide: Option<TideState>,
    #[serde(default)]
    pub water_temperature_c: Option<f64>,
}

impl Conditions {
    /// Sample closest in time to `at`, if one lies within a cadence of it
    ///
    /// A horizon that does not cover `at` yields `None` rather than a
    /// reading from hours or days away.
    pub fn sample_nearest(&self, at: DateTime<Utc>) -> Option<&EnvironmentalSample> {
        nearest_within(&self.samples, at, sample_reach(&self.samples), |_| true)
    }

    pub fn day_context(&self, sample: &EnvironmentalSample) -> Option<&DayContext> {
        self.days.iter().find(|d| d.date == sample.date())
    }
}

/// Spacing of the series, or the lone-sample reach with fewer than two
fn sample_reach(samples: &[EnvironmentalSample]) -> Duration {
    match samples {
        [first, second, ..] if second.timestamp > first.timestamp => {
            second.timestamp - first.timestamp
        }
        _ => Duration::minutes(SINGLE_SAMPLE_REACH_MINUTES),
    }
}

fn nearest_within(
    samples: &[EnvironmentalSample],
    target: DateTime<Utc>,
    reach: Duration,
    keep: impl Fn(&EnvironmentalSample) -> bool,
) -> Option<&EnvironmentalSample> {
    samples
        .iter()
        .filter(|s| keep(s) && (s.timestamp - target).abs() <= reach)
        .min_by_key(|s| (s.timestamp - target).num_seconds().abs())
}

/// Barometric trend over the [`PRESSURE_TREND_HOURS`] before `at`
pub fn pressure_trend(samples: &[EnvironmentalSample], at: DateTime<Utc>) -> Option<PressureTrend> {
    let reach = sample_reach(samples);
    let nearest = |target: DateTime<Utc>| {
        nearest_within(samples, target, reach, |s| finite(s.pressure_hpa).is_some())
    };

    let now = nearest(at)?;
    let earlier = nearest(at - Duration::hours(PRESSURE_TREND_HOURS))?;
    if earlier.timestamp >= now.timestamp {
        return None;
    }

    let delta = now.pressure_hpa? - earlier.pressure_hpa?;
    Some(if delta > PRESSURE_TREND_THRESHOLD_HPA {
        PressureTrend::Rising
    } else if delta < -PRESSURE_TREND_THRESHOLD_HPA {
        PressureTrend::Falling
    } else {
        PressureTrend::Steady
    })
}

/// Capture the signals a trigger evaluation needs at `at`
///
/// `matched_triggers` is left empty for the evaluator to fill in.
pub fn build_snapshot(
    conditions: &Conditions,
    coordinates: &GpsCoordinates,
    at: DateTime<Utc>,
    species: Species,
) -> ConditionSnapshot {
    let sample = conditions.sample_nearest(at);
    let tide = conditions.tide.as_ref().filter(|t| !t.is_empty());

    let fishing_score = sample.map(|s| {
        Scorer::new(species)
            .score(s, conditions.day_context(s), tide)
            .total
    });

    ConditionSnapshot {
        captured_at: at,
        wind_speed_kmh: sample.and_then(|s| finite(s.wind_speed_kmh)),
        wind_direction_deg: sample.and_then(|s| finite(s.wind_direction_deg)),
        wind_gusts_kmh: sample.and_then(|s| finite(s.wind_gusts_kmh)),
        air_temperature_c: sample.and_then(|s| finite(s.temperature_c)),
        pressure_hpa: sample.and_then(|s| finite(s.pressure_hpa)),
        pressure_trend: pressure_trend(&conditions.samples, at),
        tide_phase: tide.and_then(|t| t.phase_at(at)),
        tide_exchange_m: tide.and_then(|t| t.exchange_at(at)),
        next_tide_event: tide.and_then(|t| t.next_event_after(at)).copied(),
        water_temperature_c: finite(conditions.water_temperature_c),
        solunar_period: solunar_period_at(at, coordinates.longitude_f64()),
        fishing_score,
        matched_triggers: Vec::new(),
    }
}
