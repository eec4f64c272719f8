#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Points of interest around a property.
//!
//! POI geometries are fetched for a whole search box once (by default
//! from the `OpenStreetMap` [`overpass`] API), reduced to centroids, and
//! then counted per category inside a small box around each property.
//!
//! Counting uses a rectangular [`GeoBox`] containment test, not a true
//! great-circle radius. Counts are recomputed for every call; nothing is
//! cached between properties.

pub mod overpass;
pub mod service_registry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use geo::Centroid as _;
use house_price_geography_models::GeoBox;
use house_price_property_models::PoiRecord;
use thiserror::Error;

/// Errors from POI operations.
#[derive(Debug, Error)]
pub enum PoiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("POI provider returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Tag key contains characters that cannot be used in a query.
    #[error("Invalid tag key '{0}'")]
    InvalidTag(String),
}

/// A POI geometry as returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGeometry {
    /// Value of the tag the geometry matched (e.g. `"school"`).
    pub tag_value: String,
    /// Geometry in WGS84, `x` = longitude, `y` = latitude.
    pub geometry: geo::Geometry<f64>,
}

/// Source of tagged POI geometries.
#[async_trait]
pub trait PoiProvider: Send + Sync {
    /// All geometries carrying `tag` inside `bbox`.
    ///
    /// # Errors
    ///
    /// Returns [`PoiError`] if the lookup fails.
    async fn geometries_in_box(
        &self,
        bbox: &GeoBox,
        tag: &str,
    ) -> Result<Vec<RawGeometry>, PoiError>;
}

/// Fetches every geometry tagged with `tag` inside `bbox`.
///
/// # Errors
///
/// Returns [`PoiError`] if the provider fails.
pub async fn fetch_pois(
    provider: &dyn PoiProvider,
    bbox: &GeoBox,
    tag: &str,
) -> Result<Vec<RawGeometry>, PoiError> {
    let geometries = provider.geometries_in_box(bbox, tag).await?;
    log::debug!("Fetched {} '{tag}' geometries in {bbox}", geometries.len());
    Ok(geometries)
}

/// Reduces each geometry to its centroid, keeping the tag value.
///
/// Empty geometries have no centroid and are dropped.
#[must_use]
pub fn reduce_to_points(geometries: &[RawGeometry]) -> Vec<PoiRecord> {
    geometries
        .iter()
        .filter_map(|raw| {
            let Some(point) = raw.geometry.centroid() else {
                log::debug!("Skipping '{}' geometry without a centroid", raw.tag_value);
                return None;
            };
            Some(PoiRecord {
                category: raw.tag_value.clone(),
                latitude: point.y(),
                longitude: point.x(),
            })
        })
        .collect()
}

/// Counts POIs of each category inside the box of side `distance_km`
/// around `reference` (`(lat, lon)`).
///
/// The result is positional: entry `i` is the count for `categories[i]`.
/// Categories with no POIs count zero and POIs whose category is not
/// listed are ignored.
#[must_use]
pub fn count_within(
    reference: (f64, f64),
    distance_km: f64,
    pois: &[PoiRecord],
    categories: &[String],
) -> Vec<u32> {
    let bbox = GeoBox::from_radius(reference, distance_km);
    let in_range: Vec<&PoiRecord> = pois
        .iter()
        .filter(|poi| bbox.contains(poi.latitude, poi.longitude))
        .collect();

    categories
        .iter()
        .map(|category| {
            let count = in_range
                .iter()
                .filter(|poi| poi.category == *category)
                .count();
            u32::try_from(count).unwrap_or(u32::MAX)
        })
        .collect()
}

/// Number of POIs per category across the whole set.
#[must_use]
pub fn summarize_categories(pois: &[PoiRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for poi in pois {
        *counts.entry(poi.category.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use geo::{Coord, Geometry, LineString, Point, Polygon};

    use super::*;

    fn poi(category: &str, latitude: f64, longitude: f64) -> PoiRecord {
        PoiRecord {
            category: category.to_string(),
            latitude,
            longitude,
        }
    }

    fn categories(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    struct FixedProvider(Vec<RawGeometry>);

    #[async_trait]
    impl PoiProvider for FixedProvider {
        async fn geometries_in_box(
            &self,
            bbox: &GeoBox,
            _tag: &str,
        ) -> Result<Vec<RawGeometry>, PoiError> {
            Ok(self
                .0
                .iter()
                .filter(|g| {
                    g.geometry
                        .centroid()
                        .is_some_and(|p| bbox.contains(p.y(), p.x()))
                })
                .cloned()
                .collect())
        }
    }

    #[test]
    fn no_pois_gives_zero_vector_of_category_length() {
        let counts = count_within((52.2, 0.12), 0.5, &[], &categories(&["school", "pub", "cafe"]));
        assert_eq!(counts, vec![0, 0, 0]);
    }

    #[test]
    fn counts_only_inside_box_and_listed_categories() {
        let pois = vec![
            poi("school", 52.2001, 0.1201),
            poi("school", 52.1999, 0.1199),
            poi("pub", 52.2002, 0.1198),
            poi("bench", 52.2, 0.12),
            // ~1.1 km north: outside a 0.5 km box.
            poi("school", 52.21, 0.12),
        ];
        let counts = count_within((52.2, 0.12), 0.5, &pois, &categories(&["school", "pub", "cafe"]));
        assert_eq!(counts, vec![2, 1, 0]);
    }

    #[test]
    fn box_corner_counts_even_beyond_radius() {
        // A POI in the corner of the box is farther than half the side
        // length but still counts.
        let bbox = GeoBox::from_radius((52.2, 0.12), 1.0);
        let corner = poi("pub", bbox.lat_max, bbox.lon_max);
        let counts = count_within((52.2, 0.12), 1.0, &[corner], &categories(&["pub"]));
        assert_eq!(counts, vec![1]);
    }

    #[test]
    fn permuting_categories_permutes_counts() {
        let pois = vec![
            poi("school", 52.2, 0.12),
            poi("pub", 52.2, 0.12),
            poi("pub", 52.2001, 0.12),
            poi("cafe", 52.2, 0.1201),
            poi("cafe", 52.2, 0.1199),
            poi("cafe", 52.2001, 0.1199),
        ];
        let forward = categories(&["school", "pub", "cafe"]);
        let reversed = categories(&["cafe", "school", "pub"]);

        let a = count_within((52.2, 0.12), 0.5, &pois, &forward);
        let b = count_within((52.2, 0.12), 0.5, &pois, &reversed);

        assert_eq!(a, vec![1, 2, 3]);
        for (i, name) in forward.iter().enumerate() {
            let j = reversed.iter().position(|c| c == name).unwrap();
            assert_eq!(a[i], b[j]);
        }
    }

    #[test]
    fn reduces_polygons_to_centroids() {
        let square = Polygon::new(
            LineString::from(vec![
                Coord { x: 0.0, y: 52.0 },
                Coord { x: 0.2, y: 52.0 },
                Coord { x: 0.2, y: 52.2 },
                Coord { x: 0.0, y: 52.2 },
                Coord { x: 0.0, y: 52.0 },
            ]),
            vec![],
        );
        let raw = vec![
            RawGeometry {
                tag_value: "school".to_string(),
                geometry: Geometry::Polygon(square),
            },
            RawGeometry {
                tag_value: "pub".to_string(),
                geometry: Geometry::Point(Point::new(0.5, 51.5)),
            },
            RawGeometry {
                tag_value: "empty".to_string(),
                geometry: Geometry::LineString(LineString::new(vec![])),
            },
        ];

        let points = reduce_to_points(&raw);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].category, "school");
        assert!((points[0].latitude - 52.1).abs() < 1e-9);
        assert!((points[0].longitude - 0.1).abs() < 1e-9);
        assert_eq!(points[1], poi("pub", 51.5, 0.5));
    }

    #[test]
    fn summarizes_by_category() {
        let pois = vec![poi("pub", 0.0, 0.0), poi("cafe", 0.0, 0.0), poi("pub", 1.0, 1.0)];
        let summary = summarize_categories(&pois);
        assert_eq!(summary.get("pub"), Some(&2));
        assert_eq!(summary.get("cafe"), Some(&1));
        assert_eq!(summary.len(), 2);
    }

    #[tokio::test]
    async fn fetch_delegates_to_provider() {
        let provider = FixedProvider(vec![
            RawGeometry {
                tag_value: "pub".to_string(),
                geometry: Geometry::Point(Point::new(0.12, 52.2)),
            },
            RawGeometry {
                tag_value: "pub".to_string(),
                geometry: Geometry::Point(Point::new(1.5, 53.0)),
            },
        ]);
        let bbox = GeoBox::from_radius((52.2, 0.12), 3.0);
        let fetched = fetch_pois(&provider, &bbox, "amenity").await.unwrap();
        assert_eq!(fetched.len(), 1);
    }
}
