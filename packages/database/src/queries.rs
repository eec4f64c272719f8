//! Bounding-box and date-window queries over the sales tables.
//!
//! Postcodes inside the box are selected from `postcode_data` first, the
//! matching sales are filtered by date and type, and the coordinates are
//! joined back on. All values are bound with `?` placeholders.

use std::str::FromStr as _;

use chrono::NaiveDate;
use duckdb::Connection;
use house_price_geography_models::GeoBox;
use house_price_property_models::{DateWindow, PropertyType, TransactionRecord};

use crate::DbError;

const SELECT_COLUMNS: &str = "SELECT CAST(a_t.date_of_transfer AS VARCHAR), pcd.postcode, \
     pcd.latitude, pcd.longitude, a_t.property_type, a_t.price";

const POSTCODES_IN_BOX: &str = "SELECT postcode FROM postcode_data
             WHERE latitude BETWEEN ? AND ?
             AND longitude BETWEEN ? AND ?";

const JOIN_COORDINATES: &str = "INNER JOIN postcode_data pcd ON (pcd.postcode = a_t.postcode)
         ORDER BY a_t.date_of_transfer, pcd.postcode";

fn window_sql(with_type: bool) -> String {
    let type_filter = if with_type {
        "AND property_type = ?"
    } else {
        ""
    };

    format!(
        "{SELECT_COLUMNS} FROM (
            SELECT postcode, date_of_transfer, property_type, price FROM pp_data
            WHERE postcode IN ({POSTCODES_IN_BOX})
            AND date_of_transfer BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
            {type_filter}
        ) a_t
        {JOIN_COORDINATES}"
    )
}

fn box_sql() -> String {
    format!(
        "{SELECT_COLUMNS} FROM (
            SELECT postcode, date_of_transfer, property_type, price FROM pp_data
            WHERE postcode IN ({POSTCODES_IN_BOX})
        ) a_t
        {JOIN_COORDINATES}"
    )
}

/// Sales inside `bbox` whose transfer date falls in `window`, optionally
/// restricted to one property type. An empty result is not an error here.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub fn transactions_in_window(
    conn: &Connection,
    bbox: &GeoBox,
    window: &DateWindow,
    property_type: Option<PropertyType>,
) -> Result<Vec<TransactionRecord>, DbError> {
    let from = window.from.format("%Y-%m-%d").to_string();
    let to = window.to.format("%Y-%m-%d").to_string();

    let mut stmt = conn.prepare(&window_sql(property_type.is_some()))?;
    let mut rows = match property_type {
        Some(pt) => stmt.query(duckdb::params![
            bbox.lat_min,
            bbox.lat_max,
            bbox.lon_min,
            bbox.lon_max,
            from,
            to,
            pt.code(),
        ])?,
        None => stmt.query(duckdb::params![
            bbox.lat_min,
            bbox.lat_max,
            bbox.lon_min,
            bbox.lon_max,
            from,
            to,
        ])?,
    };

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(to_record(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            &row.get::<_, String>(4)?,
            row.get(5)?,
        )?);
    }

    log::debug!(
        "{} transactions in {bbox} between {} and {} (type {})",
        records.len(),
        window.from,
        window.to,
        property_type.map_or("any", PropertyType::label),
    );

    Ok(records)
}

/// All sales inside `bbox`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub fn transactions_in_box(
    conn: &Connection,
    bbox: &GeoBox,
) -> Result<Vec<TransactionRecord>, DbError> {
    let mut stmt = conn.prepare(&box_sql())?;
    let mut rows = stmt.query(duckdb::params![
        bbox.lat_min,
        bbox.lat_max,
        bbox.lon_min,
        bbox.lon_max,
    ])?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(to_record(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            &row.get::<_, String>(4)?,
            row.get(5)?,
        )?);
    }

    log::debug!("{} transactions in {bbox}", records.len());

    Ok(records)
}

fn to_record(
    date: String,
    postcode: String,
    latitude: f64,
    longitude: f64,
    property_type: &str,
    price: i64,
) -> Result<TransactionRecord, DbError> {
    let date_of_transfer =
        NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| DbError::Conversion {
            message: format!("Invalid date_of_transfer '{date}' for {postcode}: {e}"),
        })?;

    let property_type =
        PropertyType::from_str(property_type.trim()).map_err(|_| DbError::Conversion {
            message: format!("Unknown property_type '{property_type}' for {postcode}"),
        })?;

    Ok(TransactionRecord {
        date_of_transfer,
        postcode,
        latitude,
        longitude,
        property_type,
        price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DuckDbStore, TransactionStore as _, import};

    const POSTCODES: &str = "postcode,latitude,longitude
CB1 1AA,52.2000,0.1200
CB1 2BB,52.2010,0.1210
CB1 3CC,52.1990,0.1190
PE1 1ZZ,52.5700,-0.2400
";

    const SALES: &str = "price,date_of_transfer,postcode,property_type
250000,2019-03-01,CB1 1AA,D
310000,2020-07-15 00:00,CB1 2BB,D
180000,2020-08-01,CB1 3CC,F
199000,2021-01-20,CB1 3CC,T
400000,2012-05-05,CB1 1AA,D
150000,2020-02-02,PE1 1ZZ,D
";

    fn store() -> DuckDbStore {
        let store = DuckDbStore::open_in_memory().unwrap();
        import::import_postcodes(store.connection(), POSTCODES.as_bytes()).unwrap();
        import::import_price_paid(store.connection(), SALES.as_bytes()).unwrap();
        store
    }

    fn cambridge() -> GeoBox {
        GeoBox::from_radius((52.2, 0.12), 3.0)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_filters_box_date_and_type() {
        let store = store();
        let rows = store
            .query_by_window(
                &cambridge(),
                date(2020, 1, 1),
                3.0,
                Some(PropertyType::Detached),
            )
            .unwrap();

        let prices: Vec<i64> = rows.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![250_000, 310_000]);
        assert!(rows.iter().all(|r| r.property_type == PropertyType::Detached));
        assert_eq!(rows[1].date_of_transfer, date(2020, 7, 15));
        assert!((rows[1].latitude - 52.201).abs() < 1e-9);
    }

    #[test]
    fn window_without_type_returns_every_type() {
        let store = store();
        let rows = store
            .query_by_window(&cambridge(), date(2020, 1, 1), 3.0, None)
            .unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let conn = db_with_single_sale("2020-01-11");
        let window = DateWindow {
            from: date(2020, 1, 1),
            to: date(2020, 1, 11),
        };
        let rows = transactions_in_window(&conn, &cambridge(), &window, None).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn empty_window_is_reported() {
        let store = store();
        let err = store
            .query_by_window(&cambridge(), date(1999, 1, 1), 1.0, None)
            .unwrap_err();
        assert!(matches!(err, DbError::EmptyResult { .. }), "{err}");
    }

    #[test]
    fn negative_years_match_nothing() {
        let store = store();
        let err = store
            .query_by_window(&cambridge(), date(2020, 1, 1), -3.0, None)
            .unwrap_err();
        assert!(matches!(err, DbError::EmptyResult { .. }), "{err}");
    }

    #[test]
    fn query_all_ignores_date_and_type() {
        let store = store();
        let rows = store.query_all(&cambridge()).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| cambridge().contains(r.latitude, r.longitude)));

        let nowhere = GeoBox::from_radius((10.0, 10.0), 1.0);
        assert!(store.query_all(&nowhere).unwrap().is_empty());
    }

    #[test]
    fn hostile_values_are_bound_not_interpolated() {
        let store = DuckDbStore::open_in_memory().unwrap();
        let postcode = "X' OR '1'='1'); DROP TABLE pp_data; --";
        store
            .connection()
            .execute(
                "INSERT INTO postcode_data VALUES (?, ?, ?)",
                duckdb::params![postcode, 52.2, 0.12],
            )
            .unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO pp_data VALUES (?, CAST(? AS DATE), ?, ?)",
                duckdb::params![100_000_i64, "2020-01-01", postcode, "F"],
            )
            .unwrap();

        let rows = store.query_all(&cambridge()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].postcode, postcode);
    }

    fn db_with_single_sale(day: &str) -> Connection {
        let conn = crate::db::open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO postcode_data VALUES (?, ?, ?)",
            duckdb::params!["CB1 1AA", 52.2, 0.12],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO pp_data VALUES (?, CAST(? AS DATE), ?, ?)",
            duckdb::params![123_000_i64, day, "CB1 1AA", "S"],
        )
        .unwrap();
        conn
    }
}
