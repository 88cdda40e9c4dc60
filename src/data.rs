use crate::config::InputConfig;
use crate::types::{Dataset, Row};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Required column '{0}' not found in CSV")]
    MissingColumn(String),
    #[error("Line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },
    #[error("CSV contains no rows")]
    Empty,
}

/// Fetches the configured source once and builds the dataset.
pub async fn load_data(config: &InputConfig) -> Result<Dataset, DataError> {
    info!("Loading data from {}", config.source);

    let bytes = fetch_source(&config.source).await?;
    let dataset = parse_csv(&bytes, config)?;

    info!(
        "Loaded {} rows across {} countries",
        dataset.len(),
        dataset.countries().len()
    );
    Ok(dataset)
}

async fn fetch_source(source: &str) -> Result<Vec<u8>, DataError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let fetch_err = |e| DataError::Fetch {
            url: source.to_string(),
            source: e,
        };
        let response = reqwest::get(source).await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Status {
                url: source.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(fetch_err)?;
        Ok(body.to_vec())
    } else {
        tokio::fs::read(source).await.map_err(|e| DataError::Io {
            path: source.to_string(),
            source: e,
        })
    }
}

/// Column positions resolved from the header row.
struct Columns {
    country: usize,
    city: usize,
    lat: usize,
    lng: usize,
    sales: usize,
    predicted_sales: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord, config: &InputConfig) -> Result<Self, DataError> {
        let col_indices: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim(), i))
            .collect();

        let find = |name: &str| {
            col_indices
                .get(name)
                .copied()
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            country: find(&config.country_column)?,
            city: find(&config.city_column)?,
            lat: find(&config.lat_column)?,
            lng: find(&config.lng_column)?,
            sales: find(&config.sales_column)?,
            predicted_sales: find(&config.predicted_sales_column)?,
        })
    }
}

/// Parses CSV bytes into rows, renaming the sales columns on the way in.
pub fn parse_csv(bytes: &[u8], config: &InputConfig) -> Result<Dataset, DataError> {
    let mut rdr = ReaderBuilder::new().from_reader(bytes);
    let headers = rdr.headers()?.clone();
    let cols = Columns::resolve(&headers, config)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let invalid = |column: &str, raw: &str| DataError::InvalidNumber {
            line,
            column: column.to_string(),
            value: raw.to_string(),
        };

        // Coordinates must be real numbers.
        let coordinate = |idx: usize, column: &str| -> Result<f64, DataError> {
            let raw = record.get(idx).unwrap_or("").trim();
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(invalid(column, raw)),
            }
        };

        // Blank, NaN and infinite measures are missing; other text is an error.
        let measure = |idx: usize, column: &str| -> Result<Option<f64>, DataError> {
            let raw = record.get(idx).unwrap_or("").trim();
            if raw.is_empty() {
                return Ok(None);
            }
            let v = raw.parse::<f64>().map_err(|_| invalid(column, raw))?;
            Ok(v.is_finite().then_some(v))
        };

        let country = record.get(cols.country).unwrap_or("").trim();
        if country.is_empty() {
            warn!("Line {}: skipping row with no country", line);
            skipped += 1;
            continue;
        }

        rows.push(Row {
            country: country.to_string(),
            city: record.get(cols.city).unwrap_or("").trim().to_string(),
            lat: coordinate(cols.lat, &config.lat_column)?,
            lng: coordinate(cols.lng, &config.lng_column)?,
            sales: measure(cols.sales, &config.sales_column)?.unwrap_or(0.0),
            predicted_sales: measure(cols.predicted_sales, &config.predicted_sales_column)?,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} rows without a country", skipped);
    }

    if rows.is_empty() {
        return Err(DataError::Empty);
    }

    Ok(Dataset::new(rows))
}
