//! WebAssembly module for the Fishing Forecast service
//!
//! Provides client-side computation for:
//! - Per-sample fishing scores
//! - Window and day summaries of a sample series
//! - Alert profile evaluation against a snapshot
//! - Coordinate keys and moon phase for offline use

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

use shared::aggregation::{rank_days, summarize_days};
use shared::scoring::{describe, Scorer};
use shared::triggers::{circular_distance, evaluate};
use shared::validation::{validate_profile, validate_samples, validate_window_size};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("fishing forecast wasm ready"));
}

fn to_js(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn parse_species(species: &str) -> Result<Species, String> {
    if species.is_empty() {
        return Ok(Species::General);
    }
    species.parse()
}

fn score_sample_inner(sample_json: &str, species: &str) -> Result<f64, String> {
    let sample: EnvironmentalSample =
        serde_json::from_str(sample_json).map_err(|e| format!("Invalid sample JSON: {}", e))?;
    let species = parse_species(species)?;
    Ok(Scorer::new(species).score(&sample, None, None).total)
}

fn summarize_inner(
    samples_json: &str,
    days_json: &str,
    species: &str,
    window_size: usize,
) -> Result<String, String> {
    let samples: Vec<EnvironmentalSample> =
        serde_json::from_str(samples_json).map_err(|e| format!("Invalid samples JSON: {}", e))?;
    let days: Vec<DayContext> = if days_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(days_json).map_err(|e| format!("Invalid days JSON: {}", e))?
    };
    let species = parse_species(species)?;

    validate_samples(&samples).map_err(|e| e.to_string())?;
    validate_window_size(window_size).map_err(|e| e.to_string())?;

    let scored = Scorer::new(species).score_series(&samples, &days, None);
    let mut summaries = summarize_days(scored, &days, window_size);
    // Browsers only need the windows; drop per-sample detail
    for day in &mut summaries {
        day.samples.clear();
    }
    let ranking: Vec<_> = rank_days(&summaries).iter().map(|d| d.date).collect();

    serde_json::to_string(&serde_json::json!({
        "days": summaries,
        "ranking": ranking,
    }))
    .map_err(|e| e.to_string())
}

fn evaluate_inner(profile_json: &str, snapshot_json: &str) -> Result<String, String> {
    let profile: AlertProfile =
        serde_json::from_str(profile_json).map_err(|e| format!("Invalid profile JSON: {}", e))?;
    let snapshot: ConditionSnapshot = serde_json::from_str(snapshot_json)
        .map_err(|e| format!("Invalid snapshot JSON: {}", e))?;
    validate_profile(&profile).map_err(|e| e.to_string())?;

    serde_json::to_string(&evaluate(&profile, &snapshot)).map_err(|e| e.to_string())
}

/// Score one sample (JSON) for a species; empty species means general
#[wasm_bindgen]
pub fn score_sample(sample_json: &str, species: &str) -> Result<f64, JsValue> {
    score_sample_inner(sample_json, species).map_err(to_js)
}

/// Summarize a sample series into scored windows and ranked days
#[wasm_bindgen]
pub fn summarize_forecast(
    samples_json: &str,
    days_json: &str,
    species: &str,
    window_size: usize,
) -> Result<String, JsValue> {
    summarize_inner(samples_json, days_json, species, window_size).map_err(to_js)
}

/// Evaluate an alert profile against a condition snapshot
#[wasm_bindgen]
pub fn evaluate_alert_profile(profile_json: &str, snapshot_json: &str) -> Result<String, JsValue> {
    evaluate_inner(profile_json, snapshot_json).map_err(to_js)
}

/// Weather description for a sample
#[wasm_bindgen]
pub fn describe_sample(sample_json: &str) -> Result<String, JsValue> {
    let sample: EnvironmentalSample = serde_json::from_str(sample_json)
        .map_err(|e| to_js(format!("Invalid sample JSON: {}", e)))?;
    Ok(describe(&sample))
}

/// Smallest angle between two compass bearings
#[wasm_bindgen]
pub fn wind_direction_distance(a: f64, b: f64) -> f64 {
    circular_distance(a, b)
}

fn coordinate_key_inner(latitude: f64, longitude: f64, decimal_places: u32) -> Result<String, String> {
    let latitude = Decimal::try_from(latitude).map_err(|_| format!("Invalid latitude: {}", latitude))?;
    let longitude =
        Decimal::try_from(longitude).map_err(|_| format!("Invalid longitude: {}", longitude))?;
    let coordinates = GpsCoordinates::new(latitude, longitude);
    if !coordinates.is_valid() {
        return Err("Latitude must be within ±90 and longitude within ±180".to_string());
    }
    Ok(coordinates.rounded(decimal_places).to_string())
}

/// Cache key for a location, as "lat,lon" rounded to `decimal_places`
#[wasm_bindgen]
pub fn coordinate_key(latitude: f64, longitude: f64, decimal_places: u32) -> Result<String, JsValue> {
    coordinate_key_inner(latitude, longitude, decimal_places).map_err(to_js)
}

/// Moon phase (0 = new, 0.5 = full) at a Unix time in milliseconds
#[wasm_bindgen]
pub fn moon_phase_at(timestamp_ms: f64) -> f64 {
    let at = DateTime::<Utc>::from_timestamp_millis(timestamp_ms as i64).unwrap_or_default();
    shared::solunar::moon_phase_fraction(at)
}

/// Moon phase at the browser's current time
#[wasm_bindgen]
pub fn moon_phase_now() -> f64 {
    moon_phase_at(js_sys::Date::now())
}
