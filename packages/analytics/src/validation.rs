//! In-sample validation of a fitted model.
//!
//! Draws sales at random (with replacement) from the fitting set,
//! recomputes their design rows, and compares the model's predictions to
//! the recorded prices. This measures fit, not generalisation.

use house_price_analytics_models::{ValidationReport, ValidationWarning};
use house_price_property_models::{PoiRecord, TransactionRecord};
use rand::Rng;

use crate::AnalyticsError;
use crate::features::design_row;
use crate::regression::FittedModel;
use crate::stats::{mean_relative_error, pearson_correlation};

/// Mean relative error above which a warning is raised.
pub const HIGH_MEAN_ERROR_THRESHOLD: f64 = 0.5;

/// Correlation below which a warning is raised.
pub const LOW_CORRELATION_THRESHOLD: f64 = 0.3;

/// Default number of sales drawn.
pub const DEFAULT_SAMPLE_SIZE: usize = 25;

/// How validation samples are drawn and featurized.
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions<'a> {
    /// Number of sales to draw.
    pub sample_size: usize,
    /// POI counting box side, in km. Must match the fit.
    pub radius_km: f64,
    /// POI categories in fit column order.
    pub categories: &'a [String],
}

impl<'a> ValidationOptions<'a> {
    /// Options with the default sample size.
    #[must_use]
    pub const fn new(radius_km: f64, categories: &'a [String]) -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            radius_km,
            categories,
        }
    }
}

/// Scores `model` on a random sample of `transactions`.
///
/// # Errors
///
/// Returns [`AnalyticsError::EmptySample`] if there are no sales to draw
/// from, or [`AnalyticsError::DimensionMismatch`] if the options produce
/// rows of a different width than the fit.
pub fn validate<R: Rng + ?Sized>(
    model: &FittedModel,
    transactions: &[TransactionRecord],
    pois: &[PoiRecord],
    options: &ValidationOptions<'_>,
    rng: &mut R,
) -> Result<ValidationReport, AnalyticsError> {
    if transactions.is_empty() {
        return Err(AnalyticsError::EmptySample);
    }

    let mut actual = Vec::with_capacity(options.sample_size);
    let mut predicted = Vec::with_capacity(options.sample_size);

    for _ in 0..options.sample_size {
        let sale = &transactions[rng.random_range(0..transactions.len())];
        let row = design_row(sale, pois, options.radius_km, options.categories);
        let prediction = model.predict_row(&row)?;

        actual.push(sale.price);
        #[allow(clippy::cast_possible_truncation)]
        predicted.push(prediction.mean as i64);
    }

    let mean_relative_error = mean_relative_error(&actual, &predicted);
    let correlation = pearson_correlation(&actual, &predicted);
    let warnings = validation_warnings(mean_relative_error, correlation);

    log::debug!(
        "Validated {} samples: mean relative error {:.4}, correlation {:.4}",
        actual.len(),
        mean_relative_error,
        correlation
    );

    Ok(ValidationReport {
        actual,
        predicted,
        mean_relative_error,
        correlation,
        warnings,
    })
}

/// Warnings for a pair of validation metrics. NaN metrics produce an
/// [`ValidationWarning::UndefinedMetric`] instead of a threshold warning.
#[must_use]
pub fn validation_warnings(mean_relative_error: f64, correlation: f64) -> Vec<ValidationWarning> {
    let mut warnings = vec![];

    if mean_relative_error.is_nan() {
        warnings.push(ValidationWarning::UndefinedMetric {
            metric: "mean relative error".to_string(),
        });
    } else if mean_relative_error > HIGH_MEAN_ERROR_THRESHOLD {
        warnings.push(ValidationWarning::HighMeanError {
            mean_relative_error,
        });
    }

    if correlation.is_nan() {
        warnings.push(ValidationWarning::UndefinedMetric {
            metric: "correlation".to_string(),
        });
    } else if correlation < LOW_CORRELATION_THRESHOLD {
        warnings.push(ValidationWarning::LowCorrelation { correlation });
    }

    warnings
}
