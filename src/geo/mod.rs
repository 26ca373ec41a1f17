//! Great-circle geometry over latitude/longitude pairs.
//!
//! [`distance_km`] is the haversine distance used by every proximity
//! query; [`proximity`] filters stored records against it.

pub mod proximity;

pub use proximity::{find_within_radius, NearbySearch};

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point after checking both coordinates are finite and in range.
    pub fn new(latitude: f64, longitude: f64) -> ValidationResult<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Check the coordinate ranges without constructing a new point.
    pub fn validate(&self) -> ValidationResult<()> {
        if !self.latitude.is_finite() {
            return Err(ValidationError::NonFiniteCoordinate { field: "latitude" });
        }
        if !self.longitude.is_finite() {
            return Err(ValidationError::NonFiniteCoordinate { field: "longitude" });
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange {
                value: self.latitude,
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange {
                value: self.longitude,
            });
        }
        Ok(())
    }
}

/// Anything carrying a position that proximity search can filter on.
pub trait Geotagged {
    /// The record's position.
    fn point(&self) -> GeoPoint;
}

impl Geotagged for GeoPoint {
    fn point(&self) -> GeoPoint {
        *self
    }
}

/// Haversine distance between two points in kilometers.
///
/// Non-finite input yields NaN rather than an error.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().clamp(0.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BERLIN: GeoPoint = GeoPoint {
        latitude: 52.5200,
        longitude: 13.4050,
    };
    const PARIS: GeoPoint = GeoPoint {
        latitude: 48.8566,
        longitude: 2.3522,
    };
    const SYDNEY: GeoPoint = GeoPoint {
        latitude: -33.8688,
        longitude: 151.2093,
    };

    #[test]
    fn test_berlin_to_paris() {
        let d = distance_km(BERLIN, PARIS);
        assert!((d - 878.0).abs() <= 5.0, "got {}", d);
    }

    #[test]
    fn test_distance_identity() {
        for p in [BERLIN, PARIS, SYDNEY] {
            assert_eq!(distance_km(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetry() {
        assert!((distance_km(BERLIN, SYDNEY) - distance_km(SYDNEY, BERLIN)).abs() < 1e-9);
        assert!((distance_km(PARIS, SYDNEY) - distance_km(SYDNEY, PARIS)).abs() < 1e-9);
    }

    #[test]
    fn test_triangle_inequality() {
        let direct = distance_km(BERLIN, SYDNEY);
        let via_paris = distance_km(BERLIN, PARIS) + distance_km(PARIS, SYDNEY);
        assert!(direct <= via_paris + 1e-9);
    }

    #[test]
    fn test_antipodal_points_are_half_circumference() {
        let a = GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
        };
        let b = GeoPoint {
            latitude: 0.0,
            longitude: 180.0,
        };
        let d = distance_km(a, b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        let bad = GeoPoint {
            latitude: f64::NAN,
            longitude: 0.0,
        };
        assert!(distance_km(bad, PARIS).is_nan());
    }

    #[test]
    fn test_geo_point_new_validates() {
        assert!(GeoPoint::new(52.52, 13.405).is_ok());
        assert_eq!(
            GeoPoint::new(90.5, 0.0),
            Err(ValidationError::LatitudeOutOfRange { value: 90.5 })
        );
        assert_eq!(
            GeoPoint::new(0.0, -180.1),
            Err(ValidationError::LongitudeOutOfRange { value: -180.1 })
        );
        assert_eq!(
            GeoPoint::new(0.0, f64::INFINITY),
            Err(ValidationError::NonFiniteCoordinate { field: "longitude" })
        );
    }
}
