//! Trigger evaluation for alert profiles
//!
//! Each enabled trigger is checked against a condition snapshot, then the
//! results are combined with the profile's AND/OR logic. A signal missing
//! from the snapshot never satisfies a trigger.

use crate::models::{AlertProfile, ConditionSnapshot, EvaluationResult, LogicMode, TriggerSpec};

/// Smallest angle between two compass bearings, in [0, 180]
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

fn in_range(value: Option<f64>, min: f64, max: f64) -> bool {
    value.is_some_and(|v| v >= min && v <= max)
}

/// Check a single trigger against the snapshot
pub fn trigger_matches(spec: &TriggerSpec, snapshot: &ConditionSnapshot) -> bool {
    match spec {
        TriggerSpec::Wind {
            min_speed_kmh,
            max_speed_kmh,
            direction_center_deg,
            direction_tolerance_deg,
        } => {
            if !in_range(snapshot.wind_speed_kmh, *min_speed_kmh, *max_speed_kmh) {
                return false;
            }
            match (direction_center_deg, direction_tolerance_deg) {
                (Some(center), Some(tolerance)) => snapshot
                    .wind_direction_deg
                    .is_some_and(|d| circular_distance(d, *center) <= *tolerance),
                _ => true,
            }
        }
        TriggerSpec::Tide {
            phases,
            min_exchange_m,
        } => {
            let phase_ok = snapshot.tide_phase.is_some_and(|p| phases.contains(&p));
            let exchange_ok = match min_exchange_m {
                Some(min) => snapshot.tide_exchange_m.is_some_and(|e| e >= *min),
                None => true,
            };
            phase_ok && exchange_ok
        }
        TriggerSpec::Pressure { trend } => snapshot.pressure_trend == Some(*trend),
        TriggerSpec::WaterTemperature { min_c, max_c } => {
            in_range(snapshot.water_temperature_c, *min_c, *max_c)
        }
        TriggerSpec::Solunar { periods } => snapshot
            .solunar_period
            .is_some_and(|p| periods.contains(&p)),
        TriggerSpec::FishingScore { min_score } => {
            snapshot.fishing_score.is_some_and(|s| s >= *min_score)
        }
    }
}

/// Evaluate every enabled trigger of `profile` and combine the results
pub fn evaluate(profile: &AlertProfile, snapshot: &ConditionSnapshot) -> EvaluationResult {
    let mut enabled = 0usize;
    let mut matched_triggers = Vec::new();

    for trigger in profile.enabled_triggers() {
        enabled += 1;
        if trigger_matches(&trigger.spec, snapshot) {
            matched_triggers.push(trigger.spec.name().to_string());
        }
    }

    // Profiles without enabled triggers are rejected upstream; never fire one
    let satisfied = enabled > 0
        && match profile.logic {
            LogicMode::And => matched_triggers.len() == enabled,
            LogicMode::Or => !matched_triggers.is_empty(),
        };

    EvaluationResult {
        matched_triggers,
        satisfied,
    }
}
