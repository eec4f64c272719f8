//! Design-matrix assembly.
//!
//! Each sale becomes `[days_since_epoch, latitude, longitude, counts...]`
//! where the counts come from [`house_price_poi::count_within`] at the
//! sale's own coordinates. Counts are recomputed for every row.

use chrono::{NaiveDate, TimeDelta};
use house_price_analytics_models::DesignRow;
use house_price_poi::count_within;
use house_price_property_models::{PoiRecord, TransactionRecord};

/// 1970-01-01 (`NaiveDate::default()`).
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Whole days between the Unix epoch and `date`.
#[must_use]
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    (date - epoch()).num_days()
}

/// Inverse of [`days_since_epoch`]. `None` when out of range.
#[must_use]
pub fn date_from_days(days: i64) -> Option<NaiveDate> {
    epoch().checked_add_signed(TimeDelta::try_days(days)?)
}

/// Builds the design row for a single point in time and space.
///
/// When `pois` is empty the counts are still `categories.len()` zeros,
/// so every row in a fit has the same width.
#[must_use]
pub fn design_row_at(
    date: NaiveDate,
    latitude: f64,
    longitude: f64,
    pois: &[PoiRecord],
    radius_km: f64,
    categories: &[String],
) -> DesignRow {
    #[allow(clippy::cast_precision_loss)]
    let numeric_date = days_since_epoch(date) as f64;

    DesignRow {
        numeric_date,
        latitude,
        longitude,
        poi_counts: count_within((latitude, longitude), radius_km, pois, categories),
    }
}

/// Builds the design row for one sale.
#[must_use]
pub fn design_row(
    transaction: &TransactionRecord,
    pois: &[PoiRecord],
    radius_km: f64,
    categories: &[String],
) -> DesignRow {
    design_row_at(
        transaction.date_of_transfer,
        transaction.latitude,
        transaction.longitude,
        pois,
        radius_km,
        categories,
    )
}

/// Builds one design row per sale, in input order.
#[must_use]
pub fn assemble(
    transactions: &[TransactionRecord],
    pois: &[PoiRecord],
    radius_km: f64,
    categories: &[String],
) -> Vec<DesignRow> {
    let rows: Vec<DesignRow> = transactions
        .iter()
        .map(|t| design_row(t, pois, radius_km, categories))
        .collect();

    log::debug!(
        "Assembled {} design rows with {} POI columns",
        rows.len(),
        categories.len()
    );

    rows
}

#[cfg(test)]
mod tests {
    use house_price_property_models::PropertyType;

    use super::*;

    fn sale(date: NaiveDate, latitude: f64, longitude: f64) -> TransactionRecord {
        TransactionRecord {
            date_of_transfer: date,
            postcode: "CB1 1AA".to_string(),
            latitude,
            longitude,
            property_type: PropertyType::Terraced,
            price: 300_000,
        }
    }

    fn poi(category: &str, latitude: f64, longitude: f64) -> PoiRecord {
        PoiRecord {
            category: category.to_string(),
            latitude,
            longitude,
        }
    }

    #[test]
    fn epoch_is_day_zero() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(epoch), 0);
        assert_eq!(
            days_since_epoch(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            18_262
        );
        assert_eq!(
            days_since_epoch(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()),
            -1
        );
    }

    #[test]
    fn date_survives_a_trip_through_the_design_row() {
        for &(y, m, d) in &[(1995, 1, 1), (2008, 2, 29), (2021, 12, 31), (1960, 6, 15)] {
            let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            let row = design_row(&sale(date, 52.2, 0.12), &[], 0.5, &[]);
            #[allow(clippy::cast_possible_truncation)]
            let days = row.numeric_date as i64;
            assert_eq!(date_from_days(days), Some(date));
        }
    }

    #[test]
    fn rows_carry_counts_at_each_sale() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let sales = vec![sale(date, 52.2, 0.12), sale(date, 52.3, 0.2)];
        let pois = vec![
            poi("school", 52.2, 0.12),
            poi("pub", 52.2001, 0.1201),
            poi("pub", 52.3, 0.2),
        ];
        let categories = vec!["school".to_string(), "pub".to_string()];

        let rows = assemble(&sales, &pois, 0.5, &categories);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].poi_counts, vec![1, 1]);
        assert_eq!(rows[1].poi_counts, vec![0, 1]);
        assert!((rows[1].latitude - 52.3).abs() < f64::EPSILON);
        assert!((rows[0].numeric_date - 18_383.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_pois_still_fill_every_category() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let categories = vec!["school".to_string(), "pub".to_string(), "cafe".to_string()];
        let rows = assemble(&[sale(date, 52.2, 0.12)], &[], 0.5, &categories);
        assert_eq!(rows[0].poi_counts, vec![0, 0, 0]);
        assert_eq!(rows[0].width(), 6);
    }
}
