#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic windowing types.
//!
//! Converts a `(latitude, longitude)` center and a distance in kilometers
//! into a degree-aligned [`GeoBox`]. The conversion uses a fixed
//! degrees-per-kilometer factor measured once at [`REFERENCE_POINT`]
//! rather than at the query center, so boxes are only accurate near
//! latitude 52 (southern England). Far from that latitude the longitude
//! span is increasingly wrong.

use serde::{Deserialize, Serialize};

/// Diameter of the Earth in kilometers used by [`haversine_distance_km`].
pub const EARTH_DIAMETER_KM: f64 = 12_742.0;

/// `(latitude, longitude)` at which the degree-to-kilometer factors are
/// measured.
pub const REFERENCE_POINT: (f64, f64) = (52.0, 0.0);

/// Great-circle distance in kilometers between two WGS84 points.
#[must_use]
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p = std::f64::consts::PI / 180.0;
    let a = 0.5 - ((lat2 - lat1) * p).cos() / 2.0
        + (lat1 * p).cos() * (lat2 * p).cos() * (1.0 - ((lon2 - lon1) * p).cos()) / 2.0;
    // Rounding can push `a` a hair outside [0, 1] for identical or
    // antipodal points.
    EARTH_DIAMETER_KM * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Kilometers spanned by one degree of latitude at [`REFERENCE_POINT`].
#[must_use]
pub fn latitude_km_per_degree() -> f64 {
    let (lat, lon) = REFERENCE_POINT;
    haversine_distance_km(lat - 0.5, lon, lat + 0.5, lon)
}

/// Kilometers spanned by one degree of longitude at [`REFERENCE_POINT`].
#[must_use]
pub fn longitude_km_per_degree() -> f64 {
    let (lat, lon) = REFERENCE_POINT;
    haversine_distance_km(lat, lon - 0.5, lat, lon + 0.5)
}

/// An axis-aligned rectangle in latitude/longitude degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBox {
    /// Western longitude boundary.
    pub lon_min: f64,
    /// Eastern longitude boundary.
    pub lon_max: f64,
    /// Southern latitude boundary.
    pub lat_min: f64,
    /// Northern latitude boundary.
    pub lat_max: f64,
}

impl GeoBox {
    /// Creates a new box from explicit bounds.
    #[must_use]
    pub const fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }

    /// Builds a box centered on `center` (`(lat, lon)`) whose side is
    /// `distance_km` long along each axis.
    ///
    /// The kilometer-to-degree conversion is always taken at
    /// [`REFERENCE_POINT`], never at `center`.
    #[must_use]
    pub fn from_radius(center: (f64, f64), distance_km: f64) -> Self {
        let (lat, lon) = center;
        let lat_span = distance_km / latitude_km_per_degree();
        let lon_span = distance_km / longitude_km_per_degree();

        Self {
            lon_min: lon - lon_span / 2.0,
            lon_max: lon + lon_span / 2.0,
            lat_min: lat - lat_span / 2.0,
            lat_max: lat + lat_span / 2.0,
        }
    }

    /// Whether the point lies inside the box. Edges are inclusive, the
    /// same as SQL `BETWEEN`.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }

    /// Midpoint of the box as `(lat, lon)`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::midpoint(self.lat_min, self.lat_max),
            f64::midpoint(self.lon_min, self.lon_max),
        )
    }
}

impl std::fmt::Display for GeoBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lat {:.5}..{:.5}, lon {:.5}..{:.5}",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        for &(lat, lon) in &[(52.0, 0.12), (0.0, 0.0), (-33.9, 151.2), (89.9, -179.9)] {
            assert!(haversine_distance_km(lat, lon, lat, lon).abs() < 1e-9);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = (51.5074, -0.1278);
        let b = (52.2053, 0.1218);
        let ab = haversine_distance_km(a.0, a.1, b.0, b.1);
        let ba = haversine_distance_km(b.0, b.1, a.0, a.1);
        assert!((ab - ba).abs() < 1e-9);
        // London to Cambridge is roughly 80 km.
        assert!((ab - 79.5).abs() < 2.0, "got {ab}");
    }

    #[test]
    fn reference_factors() {
        assert!((latitude_km_per_degree() - 111.195).abs() < 1e-3);
        assert!((longitude_km_per_degree() - 68.458).abs() < 1e-3);
    }

    #[test]
    fn cambridge_one_km_box() {
        let b = GeoBox::from_radius((52.0, 0.12), 1.0);
        assert!((b.lon_min - 0.112_696).abs() < 1e-5, "{b}");
        assert!((b.lon_max - 0.127_304).abs() < 1e-5, "{b}");
        assert!((b.lat_min - 51.995_503).abs() < 1e-5, "{b}");
        assert!((b.lat_max - 52.004_497).abs() < 1e-5, "{b}");
    }

    #[test]
    fn box_is_ordered_and_centered() {
        let centers = [(52.0, 0.12), (-10.0, 45.0), (70.0, -170.0), (0.0, 0.0)];
        let radii = [0.0, 0.25, 1.0, 3.0, 50.0];
        for &center in &centers {
            for &radius in &radii {
                let b = GeoBox::from_radius(center, radius);
                assert!(b.lon_min <= b.lon_max);
                assert!(b.lat_min <= b.lat_max);
                let (lat, lon) = b.center();
                assert!((lat - center.0).abs() < 1e-9);
                assert!((lon - center.1).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn factors_ignore_query_latitude() {
        let south = GeoBox::from_radius((10.0, 0.0), 2.0);
        let north = GeoBox::from_radius((60.0, 0.0), 2.0);
        let south_span = south.lon_max - south.lon_min;
        let north_span = north.lon_max - north.lon_min;
        assert!((south_span - north_span).abs() < 1e-12);
    }

    #[test]
    fn contains_is_inclusive() {
        let b = GeoBox::new(0.0, 1.0, 50.0, 51.0);
        assert!(b.contains(50.0, 0.0));
        assert!(b.contains(51.0, 1.0));
        assert!(b.contains(50.5, 0.5));
        assert!(!b.contains(51.000_1, 0.5));
        assert!(!b.contains(50.5, -0.000_1));
    }
}
