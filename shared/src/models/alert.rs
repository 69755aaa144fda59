//! Alert profile, trigger and firing decision models

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::forecast::Species;
use super::tide::{TideEvent, TidePhase};
use crate::types::GpsCoordinates;

pub const MIN_COOLDOWN_HOURS: u32 = 1;
pub const MAX_COOLDOWN_HOURS: u32 = 168;

/// Direction of the barometric pressure over the last few hours
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PressureTrend {
    Rising,
    Falling,
    Steady,
}

/// Solunar feeding period
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SolunarPeriod {
    /// Moon overhead or underfoot
    Major,
    /// Moonrise or moonset
    Minor,
}

/// How enabled triggers are combined
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogicMode {
    #[default]
    And,
    Or,
}

/// Trigger condition, one variant per signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerSpec {
    Wind {
        min_speed_kmh: f64,
        max_speed_kmh: f64,
        #[serde(default)]
        direction_center_deg: Option<f64>,
        #[serde(default)]
        direction_tolerance_deg: Option<f64>,
    },
    Tide {
        phases: Vec<TidePhase>,
        #[serde(default)]
        min_exchange_m: Option<f64>,
    },
    Pressure {
        trend: PressureTrend,
    },
    WaterTemperature {
        min_c: f64,
        max_c: f64,
    },
    Solunar {
        periods: Vec<SolunarPeriod>,
    },
    FishingScore {
        min_score: f64,
    },
}

impl TriggerSpec {
    /// Stable name used in matched-trigger lists
    pub fn name(&self) -> &'static str {
        match self {
            TriggerSpec::Wind { .. } => "wind",
            TriggerSpec::Tide { .. } => "tide",
            TriggerSpec::Pressure { .. } => "pressure",
            TriggerSpec::WaterTemperature { .. } => "water_temp",
            TriggerSpec::Solunar { .. } => "solunar",
            TriggerSpec::FishingScore { .. } => "fishing_score",
        }
    }
}

/// A trigger with its enabled flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trigger {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub spec: TriggerSpec,
}

fn default_enabled() -> bool {
    true
}

impl Trigger {
    pub fn enabled(spec: TriggerSpec) -> Self {
        Self { enabled: true, spec }
    }

    pub fn disabled(spec: TriggerSpec) -> Self {
        Self {
            enabled: false,
            spec,
        }
    }
}

/// Local time-of-day window in which a profile may fire
///
/// Both `start` and `end` are inclusive. A window with `start > end`
/// wraps past midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl ActiveHours {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let local = match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
            Some(offset) => at.with_timezone(&offset).time(),
            None => at.time(),
        };

        if self.start <= self.end {
            local >= self.start && local <= self.end
        } else {
            local >= self.start || local <= self.end
        }
    }
}

/// User-defined alert profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct AlertProfile {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom = "validate_coordinates")]
    pub coordinates: GpsCoordinates,
    #[validate(custom = "validate_triggers")]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub logic: LogicMode,
    #[serde(default)]
    #[validate(custom = "validate_active_hours")]
    pub active_hours: Option<ActiveHours>,
    #[validate(range(min = 1, max = 168))]
    pub cooldown_hours: u32,
    #[serde(default = "default_enabled")]
    pub is_active: bool,
    #[serde(default)]
    pub species: Species,
}

impl AlertProfile {
    pub fn enabled_triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter().filter(|t| t.enabled)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::hours(i64::from(self.cooldown_hours))
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_coordinates(coordinates: &GpsCoordinates) -> Result<(), ValidationError> {
    if coordinates.is_valid() {
        Ok(())
    } else {
        Err(invalid("coordinates", "Latitude or longitude out of range"))
    }
}

fn validate_active_hours(hours: &ActiveHours) -> Result<(), ValidationError> {
    if hours.start == hours.end {
        return Err(invalid("active_hours", "Active hours window is empty"));
    }
    if hours.utc_offset_minutes.abs() > 14 * 60 {
        return Err(invalid("active_hours", "UTC offset out of range"));
    }
    Ok(())
}

fn validate_triggers(triggers: &Vec<Trigger>) -> Result<(), ValidationError> {
    if !triggers.iter().any(|t| t.enabled) {
        return Err(invalid("triggers", "At least one trigger must be enabled"));
    }

    let mut seen = HashSet::new();
    for trigger in triggers {
        if !seen.insert(trigger.spec.name()) {
            return Err(invalid("triggers", "Each trigger kind may appear only once"));
        }
        validate_trigger_spec(&trigger.spec)?;
    }
    Ok(())
}

fn validate_trigger_spec(spec: &TriggerSpec) -> Result<(), ValidationError> {
    match spec {
        TriggerSpec::Wind {
            min_speed_kmh,
            max_speed_kmh,
            direction_center_deg,
            direction_tolerance_deg,
        } => {
            if *min_speed_kmh < 0.0 || min_speed_kmh > max_speed_kmh {
                return Err(invalid("wind", "Wind speed range is invalid"));
            }
            if let Some(center) = direction_center_deg {
                if !(0.0..=360.0).contains(center) {
                    return Err(invalid("wind", "Wind direction must be within 0-360 degrees"));
                }
            }
            if let Some(tolerance) = direction_tolerance_deg {
                if !(0.0..=180.0).contains(tolerance) {
                    return Err(invalid("wind", "Wind tolerance must be within 0-180 degrees"));
                }
            }
        }
        TriggerSpec::Tide {
            phases,
            min_exchange_m,
        } => {
            if phases.is_empty() {
                return Err(invalid("tide", "At least one tide phase is required"));
            }
            if min_exchange_m.is_some_and(|m| m < 0.0) {
                return Err(invalid("tide", "Minimum tide exchange cannot be negative"));
            }
        }
        TriggerSpec::Pressure { .. } => {}
        TriggerSpec::WaterTemperature { min_c, max_c } => {
            if min_c > max_c {
                return Err(invalid("water_temp", "Water temperature range is invalid"));
            }
        }
        TriggerSpec::Solunar { periods } => {
            if periods.is_empty() {
                return Err(invalid("solunar", "At least one solunar period is required"));
            }
        }
        TriggerSpec::FishingScore { min_score } => {
            if !(0.0..=10.0).contains(min_score) {
                return Err(invalid("fishing_score", "Minimum score must be within 0-10"));
            }
        }
    }
    Ok(())
}

/// Signal values captured when a profile is evaluated
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConditionSnapshot {
    pub captured_at: DateTime<Utc>,
    pub wind_speed_kmh: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_gusts_kmh: Option<f64>,
    pub air_temperature_c: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub pressure_trend: Option<PressureTrend>,
    pub tide_phase: Option<TidePhase>,
    pub tide_exchange_m: Option<f64>,
    pub next_tide_event: Option<TideEvent>,
    pub water_temperature_c: Option<f64>,
    pub solunar_period: Option<SolunarPeriod>,
    pub fishing_score: Option<f64>,
    #[serde(default)]
    pub matched_triggers: Vec<String>,
}

/// Outcome of evaluating one profile against one snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub matched_triggers: Vec<String>,
    pub satisfied: bool,
}

/// Why a profile did not fire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Inactive,
    OutsideActiveHours,
    Cooldown,
    NoMatch,
    Error(String),
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Inactive => write!(f, "inactive"),
            SkipReason::OutsideActiveHours => write!(f, "outside-active-hours"),
            SkipReason::Cooldown => write!(f, "cooldown"),
            SkipReason::NoMatch => write!(f, "no-match"),
            SkipReason::Error(message) => write!(f, "error: {}", message),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one scheduler pass over one profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FiringDecision {
    pub profile_id: Uuid,
    pub triggered: bool,
    pub matched_triggers: Vec<String>,
    pub skip_reason: Option<SkipReason>,
    pub evaluated_at: DateTime<Utc>,
}

impl FiringDecision {
    pub fn fired(profile_id: Uuid, matched_triggers: Vec<String>, at: DateTime<Utc>) -> Self {
        Self {
            profile_id,
            triggered: true,
            matched_triggers,
            skip_reason: None,
            evaluated_at: at,
        }
    }

    pub fn skipped(profile_id: Uuid, reason: SkipReason, at: DateTime<Utc>) -> Self {
        Self {
            profile_id,
            triggered: false,
            matched_triggers: Vec::new(),
            skip_reason: Some(reason),
            evaluated_at: at,
        }
    }
}
