#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Property transaction and point-of-interest record types.
//!
//! These are the explicit row shapes that flow out of the transaction
//! store and the POI provider. Everything downstream (feature assembly,
//! regression, validation) consumes these types rather than loosely
//! typed tables.

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Property type of a residential sale.
///
/// Stored in the database using the single-letter codes of the UK Price
/// Paid dataset (`D`, `S`, `T`, `F`, `O`). Parsing also accepts the
/// snake_case variant names, case-insensitively.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum PropertyType {
    /// Detached house.
    #[serde(rename = "D", alias = "detached")]
    #[strum(to_string = "D", serialize = "detached")]
    Detached,
    /// Semi-detached house.
    #[serde(rename = "S", alias = "semi_detached")]
    #[strum(to_string = "S", serialize = "semi_detached", serialize = "semi-detached")]
    SemiDetached,
    /// Terraced house.
    #[serde(rename = "T", alias = "terraced")]
    #[strum(to_string = "T", serialize = "terraced")]
    Terraced,
    /// Flat or maisonette.
    #[serde(rename = "F", alias = "flat")]
    #[strum(to_string = "F", serialize = "flat")]
    Flat,
    /// Anything else.
    #[serde(rename = "O", alias = "other")]
    #[strum(to_string = "O", serialize = "other")]
    Other,
}

impl PropertyType {
    /// All property types in code order.
    pub const ALL: &[Self] = &[
        Self::Detached,
        Self::SemiDetached,
        Self::Terraced,
        Self::Flat,
        Self::Other,
    ];

    /// Single-letter database code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Detached => "D",
            Self::SemiDetached => "S",
            Self::Terraced => "T",
            Self::Flat => "F",
            Self::Other => "O",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::SemiDetached => "semi-detached",
            Self::Terraced => "terraced",
            Self::Flat => "flat",
            Self::Other => "other",
        }
    }
}

/// Inclusive date range used to filter transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    /// First day of the window.
    pub from: NaiveDate,
    /// Last day of the window.
    pub to: NaiveDate,
}

impl DateWindow {
    /// Window of `years` total width centered on `center`.
    ///
    /// Each side spans `floor(years * 365 / 2)` days. A negative `years`
    /// gives an inverted window (`from > to`) that contains no date. A
    /// non-finite `years` collapses the window to `center` alone.
    #[must_use]
    pub fn around(center: NaiveDate, years: f64) -> Self {
        let half = years * 365.0 / 2.0;
        #[allow(clippy::cast_possible_truncation)]
        let half_days = if half.is_finite() {
            half.floor() as i64
        } else {
            0
        };
        let delta = TimeDelta::try_days(half_days);
        let (low, high) = if half_days < 0 {
            (NaiveDate::MAX, NaiveDate::MIN)
        } else {
            (NaiveDate::MIN, NaiveDate::MAX)
        };

        Self {
            from: delta
                .and_then(|d| center.checked_sub_signed(d))
                .unwrap_or(low),
            to: delta
                .and_then(|d| center.checked_add_signed(d))
                .unwrap_or(high),
        }
    }

    /// Whether the window is inverted and so matches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Whether `date` falls inside the window, bounds included.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// A single sale joined with its postcode coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Completion date of the sale.
    pub date_of_transfer: NaiveDate,
    /// Postcode of the property (e.g. "CB2 1TN").
    pub postcode: String,
    /// Postcode centroid latitude.
    pub latitude: f64,
    /// Postcode centroid longitude.
    pub longitude: f64,
    /// Property type.
    pub property_type: PropertyType,
    /// Sale price in whole pounds.
    pub price: i64,
}

/// A point of interest reduced to its centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiRecord {
    /// Value of the tag the POI was fetched by (e.g. "school" for
    /// `amenity=school`).
    pub category: String,
    /// Centroid latitude.
    pub latitude: f64,
    /// Centroid longitude.
    pub longitude: f64,
}
