#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for house price estimation.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use house_price_database::{DuckDbStore, TransactionStore as _, import, paths};
use house_price_geography_models::GeoBox;
use house_price_poi::overpass::OverpassClient;
use house_price_poi::service_registry::overpass_service;
use house_price_poi::{fetch_pois, reduce_to_points, summarize_categories};
use house_price_predict::{
    DEFAULT_AMENITY_RADIUS_KM, DEFAULT_BOX_SIZE_KM, DEFAULT_BOX_YEARS, DEFAULT_POI_TAG,
    PredictError, PredictRequest, parse_date, predict_price,
};
use house_price_property_models::PropertyType;
use rand::SeedableRng as _;
use rand::rngs::StdRng;

#[derive(Parser)]
#[command(name = "house_price", about = "House price estimation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the price of a property from nearby sales and amenities
    Predict {
        /// Latitude of the property
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude of the property
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Date to predict at (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Property type code or name (D, S, T, F, O, detached, ...).
        /// If not specified, sales of every type are used.
        #[arg(long)]
        property_type: Option<PropertyType>,
        /// Comma-separated POI categories used as features (e.g.
        /// "school,pub,cafe")
        #[arg(long, value_delimiter = ',')]
        amenities: Vec<String>,
        /// Side of the sales and POI search box, in km
        #[arg(long, default_value_t = DEFAULT_BOX_SIZE_KM)]
        box_size_km: f64,
        /// Width of the sales date window, in years
        #[arg(long, default_value_t = DEFAULT_BOX_YEARS)]
        box_years: f64,
        /// Side of the box amenities are counted in, in km
        #[arg(long, default_value_t = DEFAULT_AMENITY_RADIUS_KM)]
        amenity_radius_km: f64,
        /// Number of sales drawn for validation
        #[arg(long, default_value = "25")]
        samples: usize,
        /// OSM tag key POIs are fetched by
        #[arg(long, default_value = DEFAULT_POI_TAG)]
        tag: String,
        /// Seed for the validation sample
        #[arg(long)]
        seed: Option<u64>,
        /// Database file (overrides `HOUSE_PRICE_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Overpass interpreter URL
        #[arg(long)]
        overpass_url: Option<String>,
    },
    /// Import postcode coordinates and price paid CSV files
    Import {
        /// CSV with postcode, latitude, longitude columns
        #[arg(long)]
        postcodes: Option<PathBuf>,
        /// CSV with price, date_of_transfer, postcode, property_type columns
        #[arg(long)]
        price_paid: Option<PathBuf>,
        /// Database file (overrides `HOUSE_PRICE_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List every recorded sale inside a box
    Houses {
        /// Latitude of the box center
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude of the box center
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Side of the box, in km
        #[arg(long, default_value_t = DEFAULT_BOX_SIZE_KM)]
        box_size_km: f64,
        /// Database file (overrides `HOUSE_PRICE_DB`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Count points of interest inside a box by category
    Pois {
        /// Latitude of the box center
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude of the box center
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Side of the box, in km
        #[arg(long, default_value_t = DEFAULT_BOX_SIZE_KM)]
        box_size_km: f64,
        /// OSM tag key to fetch
        #[arg(long, default_value = DEFAULT_POI_TAG)]
        tag: String,
        /// Overpass interpreter URL
        #[arg(long)]
        overpass_url: Option<String>,
    },
}

fn open_store(db: Option<PathBuf>) -> Result<DuckDbStore, Box<dyn std::error::Error>> {
    let store = match db {
        Some(path) => {
            log::info!("Using database {}", path.display());
            DuckDbStore::open(&path)?
        }
        None => {
            log::info!("Using database {}", paths::db_path().display());
            DuckDbStore::open_default()?
        }
    };
    Ok(store)
}

fn overpass_client(url: Option<String>) -> Result<OverpassClient, Box<dyn std::error::Error>> {
    let client = OverpassClient::from_service(&overpass_service())?;
    Ok(match url {
        Some(url) => client.with_base_url(url),
        None => client,
    })
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            lat,
            lon,
            date,
            property_type,
            amenities,
            box_size_km,
            box_years,
            amenity_radius_km,
            samples,
            tag,
            seed,
            db,
            overpass_url,
        } => {
            let date = parse_date(&date)?;
            let store = open_store(db)?;
            let provider = overpass_client(overpass_url)?;

            let mut request = PredictRequest::new(lat, lon, date, property_type)
                .with_categories(amenities);
            request.box_size_km = box_size_km;
            request.box_years = box_years;
            request.amenity_radius_km = amenity_radius_km;
            request.validation_samples = samples;
            request.poi_tag = tag;

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };

            match predict_price(Some(&store), &provider, &request, &mut rng).await {
                Ok(estimate) => {
                    for diagnostic in &estimate.diagnostics {
                        println!("WARNING: {diagnostic}");
                    }
                    println!(
                        "Houses: {}, POIs: {}",
                        estimate.house_count, estimate.poi_count
                    );
                    println!(
                        "Validation: mean error {:.2}%, correlation {:.2}",
                        estimate.validation.mean_relative_error * 100.0,
                        estimate.validation.correlation
                    );
                    println!(
                        "Predicted price: {} (std err {:.0}, 95% CI {:.0}..{:.0})",
                        estimate.price,
                        estimate.prediction.std_error,
                        estimate.confidence_interval.low,
                        estimate.confidence_interval.high
                    );
                }
                Err(e @ (PredictError::NoDataSource | PredictError::EmptyResult { .. })) => {
                    println!("ERROR: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Import {
            postcodes,
            price_paid,
            db,
        } => {
            if postcodes.is_none() && price_paid.is_none() {
                return Err("Nothing to import: pass --postcodes and/or --price-paid".into());
            }

            let store = open_store(db)?;
            if let Some(path) = postcodes {
                log::info!("Importing postcodes from {}...", path.display());
                let count =
                    import::import_postcodes(store.connection(), BufReader::new(File::open(path)?))?;
                log::info!("Imported {count} postcodes.");
            }
            if let Some(path) = price_paid {
                log::info!("Importing price paid data from {}...", path.display());
                let count = import::import_price_paid(
                    store.connection(),
                    BufReader::new(File::open(path)?),
                )?;
                log::info!("Imported {count} transactions.");
            }
        }
        Commands::Houses {
            lat,
            lon,
            box_size_km,
            db,
        } => {
            let store = open_store(db)?;
            let bbox = GeoBox::from_radius((lat, lon), box_size_km);
            let houses = store.query_all(&bbox)?;

            println!(
                "{:<12} {:<10} {:<14} {:>12} {:>10} {:>10}",
                "DATE", "POSTCODE", "TYPE", "PRICE", "LAT", "LON"
            );
            println!("{}", "-".repeat(73));
            for house in &houses {
                println!(
                    "{:<12} {:<10} {:<14} {:>12} {:>10.5} {:>10.5}",
                    house.date_of_transfer,
                    house.postcode,
                    house.property_type.label(),
                    house.price,
                    house.latitude,
                    house.longitude
                );
            }
            println!("{} sales in {bbox}", houses.len());
        }
        Commands::Pois {
            lat,
            lon,
            box_size_km,
            tag,
            overpass_url,
        } => {
            let provider = overpass_client(overpass_url)?;
            let bbox = GeoBox::from_radius((lat, lon), box_size_km);
            let geometries = fetch_pois(&provider, &bbox, &tag).await?;
            let pois = reduce_to_points(&geometries);

            println!("{:<30} COUNT", tag.to_uppercase());
            println!("{}", "-".repeat(40));
            for (category, count) in summarize_categories(&pois) {
                println!("{category:<30} {count}");
            }
            println!("{} POIs in {bbox}", pois.len());
        }
    }

    Ok(())
}
