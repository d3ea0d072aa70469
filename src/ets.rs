//! Historical EU ETS carbon prices and summary statistics derived from them.
use crate::forecast::parse_currency_value;
use crate::input::input_err_msg;
use anyhow::{Context, Result, bail, ensure};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::path::Path;
use unicase::UniCase;

/// Accepted names for the date column
const DATE_COLUMNS: [&str; 2] = ["date", "tarih"];

/// Accepted names for the price column, in order of preference
const PRICE_COLUMNS: [&str; 4] = ["primary market", "ets price", "price", "fiyat"];

/// Date formats tried in turn when parsing the date column.
///
/// Day-first formats are tried before month-first ones.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%b %d, %Y",
];

/// The number of most recent observations included in [`PriceStatistics::recent`]
pub const RECENT_POINTS: usize = 20;

/// A single observed carbon price
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    /// Date of the observation
    pub date: NaiveDate,
    /// Price in EUR per tonne of CO2 equivalent
    pub price: f64,
}

/// A date-ordered series of carbon prices
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory(Vec<PricePoint>);

impl PriceHistory {
    /// Load price history from a CSV file.
    ///
    /// The date and price columns are found by name (case-insensitively). Rows whose date or
    /// price can't be read are skipped. Only the most recent `limit` observations are kept.
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the CSV file
    /// * `limit` - Maximum number of observations to keep
    pub fn from_csv(file_path: &Path, limit: usize) -> Result<Self> {
        let contents = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
        Self::from_csv_str(&contents, limit).with_context(|| input_err_msg(file_path))
    }

    /// Parse price history from CSV text
    fn from_csv_str(contents: &str, limit: usize) -> Result<Self> {
        ensure!(limit > 0, "The price history limit must be greater than zero");
        let contents = contents.trim_start_matches('\u{feff}');
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(contents.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.replace('"', "").trim().to_string())
            .collect();
        let date_idx = find_column(&headers, &DATE_COLUMNS);
        let price_idx = find_column(&headers, &PRICE_COLUMNS);
        let (Some(date_idx), Some(price_idx)) = (date_idx, price_idx) else {
            bail!(
                "Could not find date and price columns. Available columns: {}",
                headers.join(", ")
            );
        };

        let mut points = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let date = record.get(date_idx).and_then(parse_date);
            let price = record.get(price_idx).and_then(parse_currency_value);
            match (date, price) {
                (Some(date), Some(price)) => points.push(PricePoint { date, price }),
                _ => debug!("Skipping row {} of price history: {record:?}", row + 1),
            }
        }
        ensure!(!points.is_empty(), "No valid price observations found");

        Ok(Self::from_points(points, limit))
    }

    /// Create a history from unordered points, keeping the most recent `limit` of them
    pub fn from_points(mut points: Vec<PricePoint>, limit: usize) -> Self {
        points.sort_by_key(|point| point.date);
        if points.len() > limit {
            points.drain(..points.len() - limit);
        }

        Self(points)
    }

    /// The observations, oldest first
    pub fn points(&self) -> &[PricePoint] {
        &self.0
    }

    /// The number of observations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no observations
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Find the index of the first candidate column present in `headers`
fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        let candidate = UniCase::new(*candidate);
        headers
            .iter()
            .position(|header| UniCase::new(header.as_str()) == candidate)
    })
}

/// Parse a date in one of the supported formats
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|datetime| datetime.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|datetime| datetime.date_naive())
        })
}

/// Summary statistics for a price series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStatistics {
    /// Number of observations
    pub count: usize,
    /// The most recent price
    pub last_price: f64,
    /// Mean price
    pub mean_price: f64,
    /// Sample standard deviation of the price
    pub std_dev: f64,
    /// Lowest observed price
    pub min_price: f64,
    /// Highest observed price
    pub max_price: f64,
    /// Mean change between consecutive observations
    pub avg_change: f64,
    /// The most recent observations, oldest first
    #[serde(skip)]
    pub recent: Vec<PricePoint>,
}

impl PriceStatistics {
    /// Calculate statistics for a series of observations, oldest first.
    ///
    /// Standard deviation and average change are zero for series with fewer than two points.
    pub fn from_series(points: &[PricePoint]) -> Result<Self> {
        ensure!(
            !points.is_empty(),
            "Cannot calculate statistics for an empty price series"
        );

        let prices = points.iter().map(|point| point.price).collect_vec();
        let count = prices.len();
        let n = count as f64;
        let mean_price = prices.iter().sum::<f64>() / n;
        let (std_dev, avg_change) = if count < 2 {
            (0.0, 0.0)
        } else {
            let variance = prices
                .iter()
                .map(|price| (price - mean_price).powi(2))
                .sum::<f64>()
                / (n - 1.0);
            let total_change: f64 = prices.iter().tuple_windows().map(|(a, b)| b - a).sum();
            (variance.sqrt(), total_change / (n - 1.0))
        };

        let stats = Self {
            count,
            last_price: prices[count - 1],
            mean_price,
            std_dev,
            min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg_change,
            recent: points[count.saturating_sub(RECENT_POINTS)..].to_vec(),
        };
        info!(
            "Price history: {} observations, last price {:.2}",
            stats.count, stats.last_price
        );

        Ok(stats)
    }
}
