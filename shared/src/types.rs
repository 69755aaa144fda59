//! Common types used across the platform

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// GPS coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GpsCoordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude_f64(&self) -> f64 {
        self.latitude.to_f64().unwrap_or_default()
    }

    pub fn longitude_f64(&self) -> f64 {
        self.longitude.to_f64().unwrap_or_default()
    }

    /// Check that latitude and longitude are within their geographic ranges
    pub fn is_valid(&self) -> bool {
        self.latitude >= Decimal::from(-90)
            && self.latitude <= Decimal::from(90)
            && self.longitude >= Decimal::from(-180)
            && self.longitude <= Decimal::from(180)
    }

    /// Round to `decimal_places` so nearby points share one key
    ///
    /// Two decimal places is roughly a 1 km grid.
    pub fn rounded(&self, decimal_places: u32) -> CoordinateKey {
        CoordinateKey {
            latitude: self
                .latitude
                .round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
            longitude: self
                .longitude
                .round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
        }
    }
}

/// Hashable, rounded coordinates used to share upstream fetches
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinateKey {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl CoordinateKey {
    pub fn to_coordinates(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.latitude, self.longitude)
    }
}

impl std::fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_nearby_points_share_key() {
        let a = GpsCoordinates::new(dec("41.4912"), dec("-71.3120"));
        let b = GpsCoordinates::new(dec("41.4938"), dec("-71.3149"));
        assert_eq!(a.rounded(2), b.rounded(2));
        assert_ne!(a.rounded(3), b.rounded(3));
    }

    #[test]
    fn test_midpoints_round_away_from_zero() {
        let even = GpsCoordinates::new(dec("41.125"), dec("-71.125"));
        let odd = GpsCoordinates::new(dec("41.135"), dec("-71.135"));
        assert_eq!(even.rounded(2).to_string(), "41.13,-71.13");
        assert_eq!(odd.rounded(2).to_string(), "41.14,-71.14");
    }

    #[test]
    fn test_coordinate_ranges() {
        assert!(GpsCoordinates::new(dec("41.49"), dec("-71.31")).is_valid());
        assert!(!GpsCoordinates::new(dec("91.0"), dec("0")).is_valid());
        assert!(!GpsCoordinates::new(dec("0"), dec("-180.5")).is_valid());
    }
}
