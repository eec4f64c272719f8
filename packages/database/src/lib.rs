#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transaction store for historical house sales.
//!
//! Sales (`pp_data`) and postcode coordinates (`postcode_data`) live in a
//! `DuckDB` file. Queries select postcodes inside a [`GeoBox`], filter the
//! sales by date window and property type, and join the coordinates back
//! on. Every predicate value is a bound parameter.

pub mod db;
pub mod import;
pub mod paths;
pub mod queries;

use std::path::Path;

use chrono::NaiveDate;
use duckdb::Connection;
use house_price_geography_models::GeoBox;
use house_price_property_models::{DateWindow, PropertyType, TransactionRecord};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No sales matched the query.
    #[error("No transactions found in {bbox} between {} and {}", .window.from, .window.to)]
    EmptyResult {
        /// Box that was searched.
        bbox: GeoBox,
        /// Date window that was searched.
        window: DateWindow,
        /// Property type filter, if any.
        property_type: Option<PropertyType>,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Read access to historical sales.
pub trait TransactionStore {
    /// Sales inside `bbox` within `years_window` years centered on
    /// `date_center`, optionally restricted to one property type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::EmptyResult`] if nothing matches, or another
    /// [`DbError`] if the query fails.
    fn query_by_window(
        &self,
        bbox: &GeoBox,
        date_center: NaiveDate,
        years_window: f64,
        property_type: Option<PropertyType>,
    ) -> Result<Vec<TransactionRecord>, DbError>;

    /// All sales inside `bbox`, regardless of date and type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn query_all(&self, bbox: &GeoBox) -> Result<Vec<TransactionRecord>, DbError>;
}

/// [`TransactionStore`] backed by a `DuckDB` connection.
pub struct DuckDbStore {
    conn: Connection,
}

impl DuckDbStore {
    /// Wraps an open connection. The schema is assumed to exist.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (or creates) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Ok(Self::new(db::open(path)?))
    }

    /// Opens the database at [`paths::db_path`] (`HOUSE_PRICE_DB` or the
    /// default location).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_default() -> Result<Self, DbError> {
        Ok(Self::new(db::open_default()?))
    }

    /// Opens an empty in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self::new(db::open_in_memory()?))
    }

    /// The underlying connection, for imports and ad-hoc queries.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TransactionStore for DuckDbStore {
    fn query_by_window(
        &self,
        bbox: &GeoBox,
        date_center: NaiveDate,
        years_window: f64,
        property_type: Option<PropertyType>,
    ) -> Result<Vec<TransactionRecord>, DbError> {
        let window = DateWindow::around(date_center, years_window);
        let records = queries::transactions_in_window(&self.conn, bbox, &window, property_type)?;

        if records.is_empty() {
            return Err(DbError::EmptyResult {
                bbox: *bbox,
                window,
                property_type,
            });
        }

        Ok(records)
    }

    fn query_all(&self, bbox: &GeoBox) -> Result<Vec<TransactionRecord>, DbError> {
        queries::transactions_in_box(&self.conn, bbox)
    }
}
