//! Approximate solunar periods
//!
//! Lunar transits are projected from a reference new moon using the mean
//! lunar day, so times are good to roughly half an hour. Major periods sit
//! around the moon's upper and lower transit, minor periods around moonrise
//! and moonset.

use chrono::{DateTime, Utc};

use crate::models::SolunarPeriod;

pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;

/// 2000-01-06 18:14 UTC
const REFERENCE_NEW_MOON_S: f64 = 947_182_440.0;
/// 2000-01-06 00:00 UTC
const REFERENCE_DAY_S: f64 = 947_116_800.0;

const MAJOR_HALF_WIDTH_S: f64 = 3600.0;
const MINOR_HALF_WIDTH_S: f64 = 1800.0;

/// Mean time between two upper transits of the moon (about 24h50m)
fn lunar_day_seconds() -> f64 {
    SYNODIC_MONTH_DAYS / (SYNODIC_MONTH_DAYS - 1.0) * 86_400.0
}

/// Upper transit nearest the reference new moon, at local solar noon
fn transit_anchor(longitude: f64) -> f64 {
    REFERENCE_DAY_S + 12.0 * 3600.0 - longitude / 15.0 * 3600.0
}

/// Distance from `offset` to the nearest multiple of `period`
fn distance_to_grid(offset: f64, period: f64) -> f64 {
    let r = offset.rem_euclid(period);
    r.min(period - r)
}

/// Fraction of the synodic month elapsed, 0 = new moon, 0.5 = full moon
pub fn moon_phase_fraction(at: DateTime<Utc>) -> f64 {
    let days = (at.timestamp() as f64 - REFERENCE_NEW_MOON_S) / 86_400.0;
    days.rem_euclid(SYNODIC_MONTH_DAYS) / SYNODIC_MONTH_DAYS
}

/// Solunar period in effect at `at` for a site at `longitude`
pub fn solunar_period_at(at: DateTime<Utc>, longitude: f64) -> Option<SolunarPeriod> {
    let half_lunar_day = lunar_day_seconds() / 2.0;
    let offset = at.timestamp() as f64 - transit_anchor(longitude);

    if distance_to_grid(offset, half_lunar_day) <= MAJOR_HALF_WIDTH_S {
        return Some(SolunarPeriod::Major);
    }

    let rise_set_offset = offset - lunar_day_seconds() / 4.0;
    if distance_to_grid(rise_set_offset, half_lunar_day) <= MINOR_HALF_WIDTH_S {
        return Some(SolunarPeriod::Minor);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_seconds(s: f64) -> DateTime<Utc> {
        DateTime::from_timestamp(s as i64, 0).unwrap()
    }

    #[test]
    fn test_major_at_anchor_transit() {
        let anchor = transit_anchor(0.0);
        assert_eq!(solunar_period_at(at_seconds(anchor), 0.0), Some(SolunarPeriod::Major));
        // Lower transit half a lunar day later
        let lower = anchor + lunar_day_seconds() / 2.0;
        assert_eq!(solunar_period_at(at_seconds(lower), 0.0), Some(SolunarPeriod::Major));
    }

    #[test]
    fn test_minor_at_moonset() {
        let moonset = transit_anchor(0.0) + lunar_day_seconds() / 4.0;
        assert_eq!(solunar_period_at(at_seconds(moonset), 0.0), Some(SolunarPeriod::Minor));
    }

    #[test]
    fn test_no_period_between() {
        let between = transit_anchor(0.0) + lunar_day_seconds() / 8.0;
        assert_eq!(solunar_period_at(at_seconds(between), 0.0), None);
    }

    #[test]
    fn test_longitude_shifts_transit() {
        // 75°W transits five hours after Greenwich
        let anchor_west = transit_anchor(-75.0);
        assert_eq!(anchor_west - transit_anchor(0.0), 5.0 * 3600.0);
        assert_eq!(solunar_period_at(at_seconds(anchor_west), -75.0), Some(SolunarPeriod::Major));
    }

    #[test]
    fn test_moon_phase_fraction() {
        assert!(moon_phase_fraction(at_seconds(REFERENCE_NEW_MOON_S)) < 1e-9);
        let full = REFERENCE_NEW_MOON_S + SYNODIC_MONTH_DAYS / 2.0 * 86_400.0;
        assert!((moon_phase_fraction(at_seconds(full)) - 0.5).abs() < 1e-3);
    }
}
