//! Database connection and schema utilities.

use std::path::Path;

use duckdb::Connection;

use crate::DbError;

/// Opens (or creates) the transaction `DuckDB` and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;

    log::debug!("Opened transaction database at {}", path.display());

    Ok(conn)
}

/// Opens the transaction database at the configured default path (see
/// [`crate::paths::db_path`]).
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&crate::paths::db_path())
}

/// Opens an in-memory database with the schema applied.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Creates the `pp_data` and `postcode_data` tables if missing.
///
/// # Errors
///
/// Returns [`DbError`] if the DDL fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS pp_data (
            price BIGINT NOT NULL,
            date_of_transfer DATE NOT NULL,
            postcode TEXT NOT NULL,
            property_type TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS postcode_data (
            postcode TEXT PRIMARY KEY,
            latitude DOUBLE NOT NULL,
            longitude DOUBLE NOT NULL
        );

        CREATE INDEX IF NOT EXISTS pp_data_postcode_idx ON pp_data (postcode);",
    )?;

    Ok(())
}
