//! CSV loaders for the sales and postcode tables.
//!
//! Both loaders expect a header row. Postcode files carry
//! `postcode,latitude,longitude`; sales files carry
//! `price,date_of_transfer,postcode,property_type`, where the date may be
//! followed by a time component (as in the UK Price Paid export).

use std::io::Read;
use std::str::FromStr as _;

use chrono::NaiveDate;
use duckdb::Connection;
use house_price_property_models::PropertyType;
use serde::Deserialize;

use crate::DbError;

#[derive(Debug, Deserialize)]
struct PostcodeRow {
    postcode: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct PricePaidRow {
    price: i64,
    date_of_transfer: String,
    postcode: String,
    property_type: String,
}

/// Loads postcode coordinates. Existing postcodes are replaced.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if a row fails to parse or the insert fails.
pub fn import_postcodes<R: Read>(conn: &Connection, reader: R) -> Result<u64, DbError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut stmt = conn.prepare("INSERT OR REPLACE INTO postcode_data VALUES (?, ?, ?)")?;

    let mut inserted = 0u64;
    for (i, result) in csv.deserialize::<PostcodeRow>().enumerate() {
        let row = result?;
        if !(-90.0..=90.0).contains(&row.latitude) || !(-180.0..=180.0).contains(&row.longitude) {
            return Err(DbError::Conversion {
                message: format!(
                    "line {}: coordinates out of range for {}",
                    i + 2,
                    row.postcode
                ),
            });
        }

        stmt.execute(duckdb::params![row.postcode, row.latitude, row.longitude])?;
        inserted += 1;
    }

    log::info!("Imported {inserted} postcodes");
    Ok(inserted)
}

/// Loads sale records.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if a row fails to parse or the insert fails.
pub fn import_price_paid<R: Read>(conn: &Connection, reader: R) -> Result<u64, DbError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut stmt = conn.prepare("INSERT INTO pp_data VALUES (?, CAST(? AS DATE), ?, ?)")?;

    let mut inserted = 0u64;
    for (i, result) in csv.deserialize::<PricePaidRow>().enumerate() {
        let row = result?;
        let line = i + 2;

        let date = parse_transfer_date(&row.date_of_transfer).ok_or_else(|| {
            DbError::Conversion {
                message: format!(
                    "line {line}: invalid date_of_transfer '{}'",
                    row.date_of_transfer
                ),
            }
        })?;

        let property_type =
            PropertyType::from_str(&row.property_type).map_err(|_| DbError::Conversion {
                message: format!("line {line}: unknown property_type '{}'", row.property_type),
            })?;

        stmt.execute(duckdb::params![
            row.price,
            date.format("%Y-%m-%d").to_string(),
            row.postcode,
            property_type.code(),
        ])?;
        inserted += 1;
    }

    log::info!("Imported {inserted} sales");
    Ok(inserted)
}

/// Parses `YYYY-MM-DD`, ignoring anything after the date (e.g. `00:00`).
fn parse_transfer_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_with_and_without_time() {
        let expected = NaiveDate::from_ymd_opt(2020, 7, 15);
        assert_eq!(parse_transfer_date("2020-07-15"), expected);
        assert_eq!(parse_transfer_date("2020-07-15 00:00"), expected);
        assert_eq!(parse_transfer_date("15/07/2020"), None);
        assert_eq!(parse_transfer_date("2020"), None);
    }

    #[test]
    fn imports_and_counts_rows() {
        let conn = crate::db::open_in_memory().unwrap();
        let postcodes = "postcode,latitude,longitude\nCB1 1AA,52.2,0.12\nCB1 2BB, 52.21 , 0.13\n";
        assert_eq!(import_postcodes(&conn, postcodes.as_bytes()).unwrap(), 2);

        let sales = "price,date_of_transfer,postcode,property_type\n\
                     100000,2020-01-01,CB1 1AA,flat\n\
                     200000,2020-02-01 00:00,CB1 2BB,S\n";
        assert_eq!(import_price_paid(&conn, sales.as_bytes()).unwrap(), 2);

        let codes: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT property_type FROM pp_data ORDER BY price")
                .unwrap();
            let mut rows = stmt.query([]).unwrap();
            let mut out = Vec::new();
            while let Some(row) = rows.next().unwrap() {
                out.push(row.get(0).unwrap());
            }
            out
        };
        assert_eq!(codes, vec!["F".to_string(), "S".to_string()]);
    }

    #[test]
    fn reimporting_a_postcode_replaces_it() {
        let conn = crate::db::open_in_memory().unwrap();
        import_postcodes(&conn, "postcode,latitude,longitude\nA,1.0,1.0\n".as_bytes()).unwrap();
        import_postcodes(&conn, "postcode,latitude,longitude\nA,2.0,2.0\n".as_bytes()).unwrap();

        let lat: f64 = conn
            .prepare("SELECT latitude FROM postcode_data WHERE postcode = ?")
            .unwrap()
            .query_row(duckdb::params!["A"], |row| row.get(0))
            .unwrap();
        assert!((lat - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unknown_property_type_with_line_number() {
        let conn = crate::db::open_in_memory().unwrap();
        let sales = "price,date_of_transfer,postcode,property_type\n\
                     100000,2020-01-01,CB1 1AA,F\n\
                     200000,2020-02-01,CB1 2BB,castle\n";
        let err = import_price_paid(&conn, sales.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let conn = crate::db::open_in_memory().unwrap();
        let err = import_postcodes(
            &conn,
            "postcode,latitude,longitude\nBAD,123.0,0.0\n".as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Conversion { .. }));
    }
}
