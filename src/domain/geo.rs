//! Geofence geometry - haversine distance and circular containment
//!
//! Spherical-earth approximation with radius 6 371 000 m. Sub-meter accuracy
//! for distances under a few hundred kilometers, which is well within the
//! tens-of-meters radius tolerances the zones are configured with. No
//! ellipsoid or altitude correction.

use crate::domain::types::{GeoPoint, Zone};

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two coordinates
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

impl Zone {
    /// Containment test, boundary-inclusive: a point exactly on the radius
    /// counts as inside.
    pub fn contains(&self, point: GeoPoint) -> bool {
        haversine_m(self.center(), point) <= self.radius_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jakarta_zone() -> Zone {
        Zone {
            id: "depot-jakarta".to_string(),
            latitude: -6.2088,
            longitude: 106.8456,
            radius_m: 50.0,
        }
    }

    #[test]
    fn test_distance_identical_points_is_zero() {
        let p = GeoPoint::new(-6.2088, 106.8456);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is ~111.19 km on the reference sphere
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        let d = haversine_m(a, b);
        assert!((d - 111_194.9).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(-6.2088, 106.8456);
        let b = GeoPoint::new(-6.2100, 106.8500);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_contains_center() {
        let zone = jakarta_zone();
        assert!(zone.contains(GeoPoint::new(-6.2088, 106.8456)));
    }

    #[test]
    fn test_contains_excludes_55m_offset() {
        // 0.0005 degrees of latitude is ~55 m, outside the 50 m radius
        let zone = jakarta_zone();
        assert!(!zone.contains(GeoPoint::new(-6.2088 + 0.0005, 106.8456)));
    }

    #[test]
    fn test_contains_is_boundary_inclusive() {
        let zone = Zone { id: "z".to_string(), latitude: 0.0, longitude: 0.0, radius_m: 0.0 };
        assert!(zone.contains(GeoPoint::new(0.0, 0.0)));

        // Radius equal to the exact computed distance must count as inside
        let point = GeoPoint::new(0.0003, 0.0);
        let d = haversine_m(GeoPoint::new(0.0, 0.0), point);
        let zone = Zone { id: "z".to_string(), latitude: 0.0, longitude: 0.0, radius_m: d };
        assert!(zone.contains(point));
    }
}
