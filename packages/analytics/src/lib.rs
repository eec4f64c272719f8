#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Price model over sales and nearby points of interest.
//!
//! [`features`] turns sales into design rows, [`regression`] fits an
//! ordinary least-squares model without an intercept, and [`validation`]
//! scores the fit on a random sample of its own sales.

pub mod features;
pub mod regression;
pub mod stats;
pub mod validation;

use thiserror::Error;

/// Errors that can occur during model fitting and prediction.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The design matrix cannot support a unique least-squares fit.
    #[error("Degenerate design matrix: {reason}")]
    DegenerateDesign {
        /// What is wrong with the matrix.
        reason: String,
    },

    /// A row has a different number of columns than the fit.
    #[error("Dimension mismatch: expected {expected} columns, got {actual}")]
    DimensionMismatch {
        /// Columns in the fitted model.
        expected: usize,
        /// Columns supplied.
        actual: usize,
    },

    /// Validation was asked to sample from no sales.
    #[error("No sales to validate against")]
    EmptySample,
}
