#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! House price estimation.
//!
//! [`predict_price`] pulls recent sales around a location from a
//! [`TransactionStore`], fetches points of interest for the same box from
//! a [`PoiProvider`], fits a least-squares model on date, position and
//! local POI counts, checks the fit against a random sample of its own
//! sales, and predicts the price at the requested location and date.

use chrono::{NaiveDate, NaiveDateTime};
use house_price_analytics::AnalyticsError;
use house_price_analytics::features::{assemble, design_row_at};
use house_price_analytics::regression::{DEFAULT_ALPHA, Prediction, fit};
use house_price_analytics::validation::{DEFAULT_SAMPLE_SIZE, ValidationOptions, validate};
use house_price_analytics_models::{ConfidenceInterval, Diagnostic, ValidationReport};
use house_price_database::{DbError, TransactionStore};
use house_price_geography_models::GeoBox;
use house_price_poi::{
    PoiError, PoiProvider, count_within, fetch_pois, reduce_to_points, summarize_categories,
};
use house_price_property_models::{DateWindow, PropertyType};
use rand::Rng;
use thiserror::Error;

/// Sales below this count produce a [`Diagnostic::LowSample`].
pub const LOW_SAMPLE_THRESHOLD: usize = 100;

/// Default side length of the sales and POI search box, in km.
pub const DEFAULT_BOX_SIZE_KM: f64 = 3.0;

/// Default width of the sales date window, in years.
pub const DEFAULT_BOX_YEARS: f64 = 3.0;

/// Default side length of the box POIs are counted in, in km.
pub const DEFAULT_AMENITY_RADIUS_KM: f64 = 0.5;

/// Default OSM tag key POIs are fetched by.
pub const DEFAULT_POI_TAG: &str = "amenity";

/// Errors that end a prediction.
#[derive(Debug, Error)]
pub enum PredictError {
    /// No transaction store was supplied.
    #[error("No database connection found")]
    NoDataSource,

    /// No sales matched the location, window, and type.
    #[error("Found no houses in {bbox} between {} and {}", .window.from, .window.to)]
    EmptyResult {
        /// Box that was searched.
        bbox: GeoBox,
        /// Date window that was searched.
        window: DateWindow,
        /// Property type filter, if any.
        property_type: Option<PropertyType>,
    },

    /// Model fitting or prediction failed (including a degenerate
    /// design matrix).
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Transaction store failure.
    #[error(transparent)]
    Database(DbError),

    /// POI lookup failure.
    #[error(transparent)]
    Poi(#[from] PoiError),

    /// A date string could not be parsed.
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl From<DbError> for PredictError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::EmptyResult {
                bbox,
                window,
                property_type,
            } => Self::EmptyResult {
                bbox,
                window,
                property_type,
            },
            other => Self::Database(other),
        }
    }
}

/// What to predict and how.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    /// Latitude of the property.
    pub latitude: f64,
    /// Longitude of the property.
    pub longitude: f64,
    /// Date to predict the price at.
    pub date: NaiveDate,
    /// Restrict comparable sales to one property type.
    pub property_type: Option<PropertyType>,
    /// POI categories used as features, in column order.
    pub categories: Vec<String>,
    /// Side of the sales and POI search box, in km.
    pub box_size_km: f64,
    /// Width of the sales date window, in years.
    pub box_years: f64,
    /// Side of the box POIs are counted in, in km.
    pub amenity_radius_km: f64,
    /// Sales drawn for validation.
    pub validation_samples: usize,
    /// OSM tag key POIs are fetched by.
    pub poi_tag: String,
}

impl PredictRequest {
    /// A request with default box sizes, window, and sample count and no
    /// POI categories.
    #[must_use]
    pub fn new(
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        property_type: Option<PropertyType>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            date,
            property_type,
            categories: vec![],
            box_size_km: DEFAULT_BOX_SIZE_KM,
            box_years: DEFAULT_BOX_YEARS,
            amenity_radius_km: DEFAULT_AMENITY_RADIUS_KM,
            validation_samples: DEFAULT_SAMPLE_SIZE,
            poi_tag: DEFAULT_POI_TAG.to_string(),
        }
    }

    /// Sets the POI categories.
    #[must_use]
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }
}

/// A predicted price and everything noticed while producing it.
#[derive(Debug, Clone)]
pub struct PriceEstimate {
    /// Predicted price, truncated to whole pounds.
    pub price: i64,
    /// Predicted mean and its standard error.
    pub prediction: Prediction,
    /// 95% confidence interval for the mean.
    pub confidence_interval: ConfidenceInterval,
    /// In-sample validation of the fit.
    pub validation: ValidationReport,
    /// Non-fatal warnings.
    pub diagnostics: Vec<Diagnostic>,
    /// Sales the model was fitted on.
    pub house_count: usize,
    /// POIs found in the search box.
    pub poi_count: usize,
    /// POI counts around the requested location, by category.
    pub local_poi_counts: Vec<u32>,
}

/// Parses `YYYY-MM-DD`, optionally followed by a `T` or space separated
/// time, which is ignored.
///
/// # Errors
///
/// Returns [`PredictError::InvalidDate`] if `raw` is neither form.
pub fn parse_date(raw: &str) -> Result<NaiveDate, PredictError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .map_err(|_| PredictError::InvalidDate(raw.to_string()))
}

/// Predicts the price of a property.
///
/// # Errors
///
/// * [`PredictError::NoDataSource`] if `store` is `None`
/// * [`PredictError::EmptyResult`] if no sales match
/// * [`PredictError::Analytics`] if the design matrix is degenerate
/// * [`PredictError::Database`] or [`PredictError::Poi`] on lookup failure
pub async fn predict_price<R: Rng + ?Sized>(
    store: Option<&dyn TransactionStore>,
    provider: &dyn PoiProvider,
    request: &PredictRequest,
    rng: &mut R,
) -> Result<PriceEstimate, PredictError> {
    let store = store.ok_or(PredictError::NoDataSource)?;
    let location = (request.latitude, request.longitude);
    let bbox = GeoBox::from_radius(location, request.box_size_km);

    let transactions =
        store.query_by_window(&bbox, request.date, request.box_years, request.property_type)?;
    if transactions.is_empty() {
        return Err(PredictError::EmptyResult {
            bbox,
            window: DateWindow::around(request.date, request.box_years),
            property_type: request.property_type,
        });
    }

    let mut diagnostics = vec![];
    if transactions.len() < LOW_SAMPLE_THRESHOLD {
        let diagnostic = Diagnostic::LowSample {
            count: transactions.len(),
        };
        log::warn!("{diagnostic}");
        diagnostics.push(diagnostic);
    }

    let geometries = fetch_pois(provider, &bbox, &request.poi_tag).await?;
    let pois = reduce_to_points(&geometries);
    let local_poi_counts = count_within(
        location,
        request.amenity_radius_km,
        &pois,
        &request.categories,
    );

    log::info!("Number of houses: {}", transactions.len());
    log::info!("Number of POIs: {}", geometries.len());
    for (category, count) in summarize_categories(&pois) {
        log::debug!("  {category}: {count}");
    }

    let rows = assemble(
        &transactions,
        &pois,
        request.amenity_radius_km,
        &request.categories,
    );
    let prices: Vec<i64> = transactions.iter().map(|t| t.price).collect();
    let model = fit(&rows, &prices)?;

    let column_names: Vec<String> = ["date", "latitude", "longitude"]
        .iter()
        .map(ToString::to_string)
        .chain(request.categories.iter().cloned())
        .collect();
    for line in model.summary(&column_names) {
        log::info!("{line}");
    }

    let options = ValidationOptions {
        sample_size: request.validation_samples,
        radius_km: request.amenity_radius_km,
        categories: &request.categories,
    };
    let validation = validate(&model, &transactions, &pois, &options, rng)?;
    log::info!(
        "Validation: actual {:?}, predicted {:?}",
        validation.actual,
        validation.predicted
    );
    log::info!(
        "Mean error: {:.2}%, correlation: {:.2}",
        validation.mean_relative_error * 100.0,
        validation.correlation
    );
    for warning in &validation.warnings {
        log::warn!("{warning}");
        diagnostics.push(Diagnostic::Validation {
            warning: warning.clone(),
        });
    }

    let row = design_row_at(
        request.date,
        request.latitude,
        request.longitude,
        &pois,
        request.amenity_radius_km,
        &request.categories,
    );
    let prediction = model.predict_row(&row)?;
    let confidence_interval = prediction.confidence_interval(DEFAULT_ALPHA);
    log::info!(
        "Prediction: {:.2} (std err {:.2}, 95% CI {:.2}..{:.2})",
        prediction.mean,
        prediction.std_error,
        confidence_interval.low,
        confidence_interval.high
    );

    #[allow(clippy::cast_possible_truncation)]
    let price = prediction.mean as i64;

    Ok(PriceEstimate {
        price,
        prediction,
        confidence_interval,
        validation,
        diagnostics,
        house_count: transactions.len(),
        poi_count: geometries.len(),
        local_poi_counts,
    })
}
