//! Geographic primitives and reverse geocoding.
//!
//! The prayer time service only needs one fact from geography: which country a
//! coordinate lies in, so that the right calculation method can be chosen.
//! That lookup is a [`Geocoder`]; failures are never fatal and collapse to
//! "unknown country" at the call site.
//!
//! - [`nominatim`]: HTTP reverse geocoder against an OpenStreetMap Nominatim instance
//! - [`StaticGeocoder`]: fixed answer, used for a configured country override

pub mod nominatim;

pub use nominatim::NominatimGeocoder;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for degree comparisons, far below any meaningful movement.
const COORDINATE_EPSILON: f64 = 1e-9;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both axes moved less than `threshold` degrees from `other`.
    ///
    /// Axes are compared independently; this is not a great-circle distance.
    /// A move of exactly `threshold` is never within, even when the f64
    /// difference lands a hair below it.
    pub fn within(&self, other: &Coordinate, threshold: f64) -> bool {
        let limit = threshold - COORDINATE_EPSILON;
        (self.latitude - other.latitude).abs() < limit
            && (self.longitude - other.longitude).abs() < limit
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::common::utils::format_coordinates(
            self.latitude,
            self.longitude,
        ))
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Transport(String),
    #[error("geocoder returned HTTP {0}")]
    Status(u16),
    #[error("geocoder response could not be parsed: {0}")]
    Payload(String),
}

/// Maps a coordinate to an ISO 3166-1 alpha-2 country code.
#[cfg_attr(test, mockall::automock)]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` means the coordinate resolved to no country (open sea, etc.).
    fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError>;
}

/// Always answers with the same country.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    country: Option<String>,
}

impl StaticGeocoder {
    pub fn new(country: Option<String>) -> Self {
        Self {
            country: country.map(|c| c.to_ascii_uppercase()),
        }
    }
}

impl Geocoder for StaticGeocoder {
    fn reverse_geocode(&self, _coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        Ok(self.country.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_is_per_axis_and_strict() {
        let base = Coordinate::new(30.0, 31.0);
        assert!(base.within(&Coordinate::new(30.05, 31.09), 0.1));
        assert!(!base.within(&Coordinate::new(30.0, 31.1), 0.1));
        assert!(!base.within(&Coordinate::new(30.15, 31.0), 0.1));
        // A diagonal move just under the threshold on each axis still counts as jitter
        assert!(base.within(&Coordinate::new(30.099, 31.099), 0.1));
    }

    #[test]
    fn test_exact_threshold_moves_are_not_within() {
        // 0.3 - 0.2 and 0.8 - 0.7 are slightly below 0.1 in f64
        for (from, to) in [(0.2, 0.3), (0.7, 0.8), (10.0, 10.1), (-0.3, -0.2)] {
            let a = Coordinate::new(from, 10.0);
            let b = Coordinate::new(to, 10.0);
            assert!(!a.within(&b, 0.1), "{from} -> {to}");
            let a = Coordinate::new(10.0, from);
            let b = Coordinate::new(10.0, to);
            assert!(!a.within(&b, 0.1), "{from} -> {to}");
        }
    }

    #[test]
    fn test_validity() {
        assert!(Coordinate::new(90.0, -180.0).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 180.5).is_valid());
    }

    #[test]
    fn test_static_geocoder_normalizes_case() {
        let geocoder = StaticGeocoder::new(Some("eg".to_string()));
        assert_eq!(
            geocoder
                .reverse_geocode(Coordinate::new(0.0, 0.0))
                .unwrap()
                .as_deref(),
            Some("EG")
        );
        let unknown = StaticGeocoder::new(None);
        assert_eq!(unknown.reverse_geocode(Coordinate::new(0.0, 0.0)).unwrap(), None);
    }
}
