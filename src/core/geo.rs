//! Geospatial types and the proximity predicate
//!
//! Locations are stored as PostGIS `geography(Point, 4326)` so distance
//! checks use true earth-surface distance rather than flat-plane degree
//! distance. The in-memory store mirrors the same semantics with a
//! haversine great-circle evaluator, so proximity behavior matches at
//! all latitudes regardless of backend.

use serde::{Deserialize, Serialize};

use crate::core::error::FilterError;
use crate::core::filter::{BindValue, Clause};

/// Mean earth radius in meters, as used by the haversine evaluator.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 point. Longitude before latitude, matching PostGIS
/// `ST_MakePoint(lon, lat)` argument order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// The placeholder point recorded when geocoding definitively fails.
    pub const SENTINEL: Coordinates = Coordinates {
        longitude: 0.0,
        latitude: 0.0,
    };

    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Validate a caller-supplied center point.
    ///
    /// Rejects non-finite numbers and out-of-range coordinates; the
    /// proximity clause is only ever built from a checked point.
    pub fn checked(longitude: f64, latitude: f64) -> Result<Self, FilterError> {
        if !longitude.is_finite() || longitude.abs() > 180.0 {
            return Err(FilterError::InvalidCoordinate {
                field: "longitude",
                value: longitude.to_string(),
            });
        }
        if !latitude.is_finite() || latitude.abs() > 90.0 {
            return Err(FilterError::InvalidCoordinate {
                field: "latitude",
                value: latitude.to_string(),
            });
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Whether this point is the failed-geocoding placeholder.
    pub fn is_sentinel(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }
}

/// Build the proximity clause: the location's point lies within
/// `radius_meters` of `center` along the earth's surface.
///
/// The radius is a configured constant, never caller-supplied, which
/// bounds the cost of the query.
pub fn within_radius(center: Coordinates, radius_meters: f64) -> Clause {
    Clause::new(
        "ST_DWithin(l.coordinates, ST_SetSRID(ST_MakePoint($?, $?), 4326)::geography, $?)",
        vec![
            BindValue::Float(center.longitude),
            BindValue::Float(center.latitude),
            BindValue::Float(radius_meters),
        ],
    )
}

/// Great-circle distance between two points in meters.
///
/// Used by the in-memory store to evaluate the proximity filter with
/// the same geodesic semantics the database applies via `ST_DWithin`.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_accepts_valid_point() {
        let point = Coordinates::checked(-122.4194, 37.7749).unwrap();
        assert_eq!(point.longitude, -122.4194);
        assert_eq!(point.latitude, 37.7749);
        assert!(!point.is_sentinel());
    }

    #[test]
    fn test_checked_rejects_nan_and_infinity() {
        assert!(Coordinates::checked(f64::NAN, 10.0).is_err());
        assert!(Coordinates::checked(10.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(Coordinates::checked(181.0, 0.0).is_err());
        assert!(Coordinates::checked(0.0, 91.0).is_err());
        assert!(Coordinates::checked(180.0, 90.0).is_ok());
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(Coordinates::SENTINEL.is_sentinel());
        assert!(!Coordinates::new(0.0, 0.1).is_sentinel());
    }

    #[test]
    fn test_haversine_zero_distance() {
        let p = Coordinates::new(18.0686, 59.3293);
        assert_eq!(haversine_meters(p, p), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris <-> London is roughly 344 km.
        let paris = Coordinates::new(2.3522, 48.8566);
        let london = Coordinates::new(-0.1276, 51.5072);
        let d = haversine_meters(paris, london);
        assert!((d - 344_000.0).abs() < 5_000.0, "got {}", d);
    }

    #[test]
    fn test_haversine_longitude_degrees_shrink_near_pole() {
        // One degree of longitude spans ~111 km at the equator but only
        // a fraction of that at 85°N. A flat-degree metric would treat
        // both as equal.
        let equator = haversine_meters(Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 0.0));
        let near_pole = haversine_meters(Coordinates::new(0.0, 85.0), Coordinates::new(1.0, 85.0));
        assert!((equator - 111_195.0).abs() < 500.0, "got {}", equator);
        assert!(near_pole < equator / 10.0, "got {}", near_pole);
    }

    #[test]
    fn test_within_radius_clause_shape() {
        let clause = within_radius(Coordinates::new(-122.4, 37.8), 50_000.0);
        assert!(clause.sql().contains("ST_DWithin"));
        assert_eq!(clause.binds().len(), 3);
        assert_eq!(clause.sql().matches("$?").count(), 3);
    }
}
