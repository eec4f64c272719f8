//! `OpenStreetMap` Overpass API client.
//!
//! Fetches every node, way, and relation carrying a tag key inside a
//! bounding box using `out geom`, so way and relation geometries come
//! back inline and no second lookup for node coordinates is needed.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use geo::{Coord, Geometry, GeometryCollection, LineString, Point, Polygon};
use house_price_geography_models::GeoBox;
use serde::Deserialize;

use crate::service_registry::PoiService;
use crate::{PoiError, PoiProvider, RawGeometry};

/// Extra time the HTTP client waits beyond the server-side timeout.
const CLIENT_TIMEOUT_SLACK_SECS: u64 = 15;

/// [`PoiProvider`] backed by an Overpass interpreter endpoint.
pub struct OverpassClient {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl OverpassClient {
    /// Builds a client from a service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoiError`] if the HTTP client cannot be constructed.
    pub fn from_service(service: &PoiService) -> Result<Self, PoiError> {
        let client = reqwest::Client::builder()
            .user_agent(service.user_agent.clone())
            .timeout(Duration::from_secs(
                service.timeout_secs + CLIENT_TIMEOUT_SLACK_SECS,
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: service.base_url.clone(),
            timeout_secs: service.timeout_secs,
        })
    }

    /// Points the client at a different interpreter URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The interpreter URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PoiProvider for OverpassClient {
    async fn geometries_in_box(
        &self,
        bbox: &GeoBox,
        tag: &str,
    ) -> Result<Vec<RawGeometry>, PoiError> {
        let query = build_query(bbox, tag, self.timeout_secs)?;
        log::debug!("Overpass query: {query}");

        let resp = self
            .client
            .post(&self.base_url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PoiError::RateLimited);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PoiError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body = resp.text().await?;
        parse_response(&body, tag)
    }
}

/// Builds the Overpass QL query for all elements carrying `tag`.
///
/// Tag keys are limited to OSM key characters so they cannot break out
/// of the quoted filter.
///
/// # Errors
///
/// Returns [`PoiError::InvalidTag`] for empty keys or keys with other
/// characters.
pub fn build_query(bbox: &GeoBox, tag: &str, timeout_secs: u64) -> Result<String, PoiError> {
    let valid = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'));
    if !valid {
        return Err(PoiError::InvalidTag(tag.to_string()));
    }

    Ok(format!(
        "[out:json][timeout:{timeout_secs}];\
         nwr[\"{tag}\"]({south},{west},{north},{east});\
         out geom;",
        south = bbox.lat_min,
        west = bbox.lon_min,
        north = bbox.lat_max,
        east = bbox.lon_max,
    ))
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
    /// Set when the server aborted the query (timeout, memory).
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<&LatLon> for Coord<f64> {
    fn from(p: &LatLon) -> Self {
        Self { x: p.lon, y: p.lat }
    }
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(default)]
    geometry: Vec<LatLon>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        #[serde(default)]
        geometry: Vec<LatLon>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
}

/// Parses an Overpass JSON body into tagged geometries.
///
/// Elements without the tag, or without any coordinates, are skipped.
fn parse_response(body: &str, tag: &str) -> Result<Vec<RawGeometry>, PoiError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| PoiError::Parse {
            message: format!("Failed to parse Overpass response: {e}"),
        })?;

    if let Some(remark) = &response.remark {
        log::warn!("Overpass remark: {remark}");
    }

    let mut geometries = Vec::with_capacity(response.elements.len());
    for element in &response.elements {
        let (tags, geometry) = match element {
            Element::Node { lat, lon, tags } => (tags, Some(Geometry::Point(Point::new(*lon, *lat)))),
            Element::Way { geometry, tags } => (tags, way_geometry(geometry)),
            Element::Relation { members, tags } => (tags, relation_geometry(members)),
        };

        let Some(tag_value) = tags.get(tag) else {
            continue;
        };
        let Some(geometry) = geometry else {
            log::debug!("Skipping '{tag_value}' element without geometry");
            continue;
        };

        geometries.push(RawGeometry {
            tag_value: tag_value.clone(),
            geometry,
        });
    }

    Ok(geometries)
}

/// Closed ways become polygons, open ways line strings.
fn way_geometry(points: &[LatLon]) -> Option<Geometry<f64>> {
    let coords: Vec<Coord<f64>> = points.iter().map(Coord::from).collect();
    match coords.len() {
        0 => None,
        1 => Some(Geometry::Point(Point(coords[0]))),
        n if n >= 4 && coords[0] == coords[n - 1] => Some(Geometry::Polygon(Polygon::new(
            LineString::new(coords),
            vec![],
        ))),
        _ => Some(Geometry::LineString(LineString::new(coords))),
    }
}

fn relation_geometry(members: &[Member]) -> Option<Geometry<f64>> {
    let parts: Vec<Geometry<f64>> = members
        .iter()
        .filter_map(|m| match (m.lat, m.lon) {
            (Some(lat), Some(lon)) => Some(Geometry::Point(Point::new(lon, lat))),
            _ => way_geometry(&m.geometry),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(Geometry::GeometryCollection(GeometryCollection(parts)))
    }
}
