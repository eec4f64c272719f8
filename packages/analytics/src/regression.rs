//! Ordinary least squares without an intercept.
//!
//! The design matrix is used exactly as given; no constant column is
//! added. Rank-deficient matrices are rejected rather than solved with a
//! pseudo-inverse, so a category that never occurs (an all-zero column)
//! fails the fit instead of producing a meaningless coefficient.

use house_price_analytics_models::{ConfidenceInterval, DesignRow};
use nalgebra::{DMatrix, DVector};

use crate::AnalyticsError;
use crate::stats::student_t_critical;

/// Significance level used when none is specified (95% interval).
pub const DEFAULT_ALPHA: f64 = 0.05;

/// A fitted least-squares model.
#[derive(Debug, Clone)]
pub struct FittedModel {
    coefficients: DVector<f64>,
    covariance: DMatrix<f64>,
    observations: usize,
    residual_df: usize,
    sum_squared_residuals: f64,
    r_squared: f64,
}

/// Point estimate with its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted mean.
    pub mean: f64,
    /// Standard error of the predicted mean.
    pub std_error: f64,
    /// Residual degrees of freedom of the fit that produced it.
    pub residual_df: usize,
}

impl Prediction {
    /// Two-sided `1 - alpha` confidence interval for the mean, using the
    /// Student-t distribution with the fit's residual degrees of freedom.
    #[must_use]
    pub fn confidence_interval(&self, alpha: f64) -> ConfidenceInterval {
        #[allow(clippy::cast_precision_loss)]
        let t = student_t_critical(alpha, self.residual_df as f64);
        let half_width = t * self.std_error;

        ConfidenceInterval {
            alpha,
            low: self.mean - half_width,
            high: self.mean + half_width,
        }
    }
}

/// Fits prices against design rows.
///
/// # Errors
///
/// Returns [`AnalyticsError::DegenerateDesign`] if the rows and prices
/// disagree in length, the rows disagree in width, there are no more
/// rows than columns, or the matrix is rank-deficient.
pub fn fit(rows: &[DesignRow], prices: &[i64]) -> Result<FittedModel, AnalyticsError> {
    let values: Vec<Vec<f64>> = rows.iter().map(DesignRow::values).collect();
    #[allow(clippy::cast_precision_loss)]
    let targets: Vec<f64> = prices.iter().map(|&p| p as f64).collect();
    FittedModel::from_observations(&values, &targets)
}

impl FittedModel {
    /// Fits `targets` against raw observation vectors.
    ///
    /// # Errors
    ///
    /// See [`fit`].
    pub fn from_observations(
        observations: &[Vec<f64>],
        targets: &[f64],
    ) -> Result<Self, AnalyticsError> {
        let n = observations.len();
        if n != targets.len() {
            return Err(degenerate(format!(
                "{n} rows but {} target values",
                targets.len()
            )));
        }

        let k = observations.first().map_or(0, Vec::len);
        if k == 0 {
            return Err(degenerate("no columns".to_string()));
        }
        if let Some(bad) = observations.iter().find(|row| row.len() != k) {
            return Err(degenerate(format!(
                "rows have {} and {k} columns",
                bad.len()
            )));
        }
        if n <= k {
            return Err(degenerate(format!(
                "{n} rows are not enough for {k} columns"
            )));
        }

        let x = DMatrix::from_fn(n, k, |i, j| observations[i][j]);
        let y = DVector::from_column_slice(targets);

        let svd = x.clone().svd(true, true);
        let max_singular = svd.singular_values.max();
        #[allow(clippy::cast_precision_loss)]
        let tolerance = max_singular * n.max(k) as f64 * f64::EPSILON;
        let rank = svd
            .singular_values
            .iter()
            .filter(|&&s| s > tolerance)
            .count();
        if rank < k {
            return Err(degenerate(format!(
                "rank {rank} is below {k} columns (constant, empty, or collinear features)"
            )));
        }

        let coefficients = svd
            .solve(&y, tolerance)
            .map_err(|e| degenerate(e.to_string()))?;

        // (XᵀX)⁻¹ = V Σ⁻² Vᵀ
        let v_t = svd
            .v_t
            .as_ref()
            .ok_or_else(|| degenerate("SVD did not produce V".to_string()))?;
        let inv_sq = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1.0 / (s * s)));
        let xtx_inv = v_t.transpose() * inv_sq * v_t;

        let residuals = &y - &x * &coefficients;
        let sum_squared_residuals = residuals.norm_squared();
        let residual_df = n - k;
        #[allow(clippy::cast_precision_loss)]
        let sigma_sq = sum_squared_residuals / residual_df as f64;
        let total = y.norm_squared();
        let r_squared = if total > 0.0 {
            1.0 - sum_squared_residuals / total
        } else {
            f64::NAN
        };

        Ok(Self {
            coefficients,
            covariance: xtx_inv * sigma_sq,
            observations: n,
            residual_df,
            sum_squared_residuals,
            r_squared,
        })
    }

    /// Predicts the mean for one observation vector.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::DimensionMismatch`] if `x` has a
    /// different width than the fit.
    pub fn predict(&self, x: &[f64]) -> Result<Prediction, AnalyticsError> {
        let k = self.coefficients.len();
        if x.len() != k {
            return Err(AnalyticsError::DimensionMismatch {
                expected: k,
                actual: x.len(),
            });
        }

        let x = DVector::from_column_slice(x);
        let mean = x.dot(&self.coefficients);
        let variance = (&self.covariance * &x).dot(&x);

        Ok(Prediction {
            mean,
            std_error: variance.max(0.0).sqrt(),
            residual_df: self.residual_df,
        })
    }

    /// Predicts the mean for a design row.
    ///
    /// # Errors
    ///
    /// See [`FittedModel::predict`].
    pub fn predict_row(&self, row: &DesignRow) -> Result<Prediction, AnalyticsError> {
        self.predict(&row.values())
    }

    /// Fitted coefficients in column order.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        self.coefficients.as_slice()
    }

    /// Standard errors of the coefficients.
    #[must_use]
    pub fn standard_errors(&self) -> Vec<f64> {
        self.covariance
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect()
    }

    /// Number of columns the model expects.
    #[must_use]
    pub fn width(&self) -> usize {
        self.coefficients.len()
    }

    /// Number of observations fitted.
    #[must_use]
    pub const fn observations(&self) -> usize {
        self.observations
    }

    /// Residual degrees of freedom.
    #[must_use]
    pub const fn residual_df(&self) -> usize {
        self.residual_df
    }

    /// Uncentered R², the usual goodness of fit for a model without an
    /// intercept.
    #[must_use]
    pub const fn r_squared(&self) -> f64 {
        self.r_squared
    }

    /// Human-readable fit summary, one line per entry. `names` labels the
    /// columns; missing names fall back to `x{i}`.
    #[must_use]
    pub fn summary(&self, names: &[String]) -> Vec<String> {
        let mut lines = vec![format!(
            "OLS: {} observations, {} columns, df {}, R² (uncentered) {:.4}, SSR {:.4e}",
            self.observations(),
            self.width(),
            self.residual_df,
            self.r_squared,
            self.sum_squared_residuals,
        )];

        for (i, (coef, se)) in self
            .coefficients
            .iter()
            .zip(self.standard_errors())
            .enumerate()
        {
            let name = names.get(i).cloned().unwrap_or_else(|| format!("x{i}"));
            lines.push(format!("  {name:<24} {coef:>16.6} ± {se:.6}"));
        }

        lines
    }
}

fn degenerate(reason: String) -> AnalyticsError {
    AnalyticsError::DegenerateDesign { reason }
}
