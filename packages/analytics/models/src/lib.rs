#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Regression input and output types.
//!
//! Defines the design-matrix row fed to the least-squares fit, the
//! confidence interval attached to a prediction, and the validation
//! report and diagnostics surfaced to the caller alongside a price.

use serde::{Deserialize, Serialize};

/// Number of leading non-POI columns in a [`DesignRow`].
pub const BASE_COLUMNS: usize = 3;

/// Feature vector for one sale.
///
/// Column order is `[numeric_date, latitude, longitude, poi_counts...]`.
/// Every row fitted together, and every row predicted against that fit,
/// must use the same category order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignRow {
    /// Days since the Unix epoch.
    pub numeric_date: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// POI counts, positional by category.
    pub poi_counts: Vec<u32>,
}

impl DesignRow {
    /// Number of columns this row contributes.
    #[must_use]
    pub fn width(&self) -> usize {
        BASE_COLUMNS + self.poi_counts.len()
    }

    /// Flattens the row into regression inputs.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.width());
        values.push(self.numeric_date);
        values.push(self.latitude);
        values.push(self.longitude);
        values.extend(self.poi_counts.iter().map(|&c| f64::from(c)));
        values
    }
}

/// Two-sided confidence interval for a predicted mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceInterval {
    /// Significance level (0.05 for a 95% interval).
    pub alpha: f64,
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

/// Non-fatal quality signal from sample validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Mean relative error above the acceptable threshold.
    HighMeanError {
        /// Observed mean relative error (0.0-1.0).
        mean_relative_error: f64,
    },
    /// Actual/predicted correlation below the acceptable threshold.
    LowCorrelation {
        /// Observed Pearson correlation.
        correlation: f64,
    },
    /// A metric could not be computed (zero denominator or zero
    /// variance).
    UndefinedMetric {
        /// Name of the undefined metric.
        metric: String,
    },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighMeanError {
                mean_relative_error,
            } => write!(f, "High mean error ({:.2}%)", mean_relative_error * 100.0),
            Self::LowCorrelation { correlation } => {
                write!(f, "Low correlation ({correlation:.2})")
            }
            Self::UndefinedMetric { metric } => write!(f, "Undefined {metric}"),
        }
    }
}

/// Result of validating a fit against a random sample of its own
/// training sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Actual sale prices of the sampled rows.
    pub actual: Vec<i64>,
    /// Predicted prices of the sampled rows, truncated to whole pounds.
    pub predicted: Vec<i64>,
    /// Mean of `|actual - predicted| / max(actual, predicted)`; NaN when
    /// undefined.
    pub mean_relative_error: f64,
    /// Pearson correlation of actual and predicted; NaN when undefined.
    pub correlation: f64,
    /// Quality warnings.
    pub warnings: Vec<ValidationWarning>,
}

/// Non-fatal condition noticed while producing a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Fewer sales than recommended for a stable fit.
    LowSample {
        /// Number of sales found.
        count: usize,
    },
    /// Validation produced a warning.
    Validation {
        /// The warning.
        warning: ValidationWarning,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowSample { count } => write!(
                f,
                "Possibly not enough houses for a good prediction ({count})"
            ),
            Self::Validation { warning } => write!(f, "{warning}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_values_follow_column_order() {
        let row = DesignRow {
            numeric_date: 18_000.0,
            latitude: 52.2,
            longitude: 0.12,
            poi_counts: vec![3, 0, 1],
        };
        assert_eq!(row.width(), 6);
        assert_eq!(row.values(), vec![18_000.0, 52.2, 0.12, 3.0, 0.0, 1.0]);
    }

    #[test]
    fn warnings_render_as_percentages() {
        let warning = ValidationWarning::HighMeanError {
            mean_relative_error: 0.5612,
        };
        assert_eq!(warning.to_string(), "High mean error (56.12%)");

        let diagnostic = Diagnostic::LowSample { count: 40 };
        assert!(diagnostic.to_string().contains("(40)"));
    }

    #[test]
    fn diagnostics_serialize_with_kind_tag() {
        let diagnostic = Diagnostic::Validation {
            warning: ValidationWarning::LowCorrelation { correlation: 0.2 },
        };
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["warning"]["kind"], "low_correlation");
    }
}
