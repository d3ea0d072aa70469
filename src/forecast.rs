//! Extraction of forecast tables from free text returned by a text-generation model.
//!
//! The model is asked to reply with a markdown-style table (`Quarter | Forecasted Value`), but
//! there is no guarantee about what actually comes back. Parsing is therefore best effort: lines
//! which cannot be understood are skipped and the result may be empty, but a value is never made
//! up and parsing never fails.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Matches a markdown table border row, e.g. `|---|:---:|` or `--- | ---`
static TABLE_BORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s|:+]*-[\s|:+\-]*$").expect("Invalid table border regex"));

/// A single forecast value for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Free-form period label (e.g. "Q1 2025")
    pub period_label: String,
    /// The forecast value
    pub value: f64,
}

/// A forecast value with a cost derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostForecastPoint {
    /// Free-form period label (e.g. "Q1 2025")
    pub period_label: String,
    /// The forecast carbon price the cost was derived from
    pub reference_value: f64,
    /// The estimated cost for the period
    pub derived_cost: f64,
}

/// Forecast points in the order they appeared in the source text.
///
/// Period labels need not be unique.
pub type ForecastTable = Vec<ForecastPoint>;

/// Cost forecast points in the order they appeared in the source text
pub type CostForecastTable = Vec<CostForecastPoint>;

/// Parse a two-column `period | value` table out of free text.
///
/// Header rows (anything mentioning "quarter"), table borders, prose and any row whose value
/// cannot be read as a number are skipped.
pub fn parse_forecast_table(raw_text: &str) -> ForecastTable {
    table_rows(raw_text, 2)
        .filter_map(|fields| {
            Some(ForecastPoint {
                period_label: fields[0].to_string(),
                value: parse_currency_value(fields[1])?,
            })
        })
        .collect()
}

/// Parse a three-column `period | price | cost` table out of free text.
///
/// The same rules as [`parse_forecast_table`] apply, except that both numeric columns must be
/// readable for a row to be kept.
pub fn parse_cost_forecast_table(raw_text: &str) -> CostForecastTable {
    table_rows(raw_text, 3)
        .filter_map(|fields| {
            Some(CostForecastPoint {
                period_label: fields[0].to_string(),
                reference_value: parse_currency_value(fields[1])?,
                derived_cost: parse_currency_value(fields[2])?,
            })
        })
        .collect()
}

/// Iterate over the trimmed fields of candidate table rows with at least `min_fields` values
fn table_rows(raw_text: &str, min_fields: usize) -> impl Iterator<Item = Vec<&str>> {
    raw_text
        .lines()
        .filter(|line| line.contains('|') && !is_table_furniture(line))
        .map(split_fields)
        .filter(move |fields| fields.iter().filter(|f| !f.is_empty()).count() >= min_fields)
}

/// Whether the line is a header row or border rather than data
fn is_table_furniture(line: &str) -> bool {
    line.to_lowercase().contains("quarter") || line.contains("---") || TABLE_BORDER.is_match(line)
}

/// Split a row on `|`, dropping the empty fields produced by leading and trailing pipes
fn split_fields(line: &str) -> Vec<&str> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    let Some(start) = fields.iter().position(|f| !f.is_empty()) else {
        return Vec::new();
    };
    let end = fields
        .iter()
        .rposition(|f| !f.is_empty())
        .map_or(start, |i| i + 1);

    fields[start..end].to_vec()
}

/// Read a monetary value such as `€85.50`, `1,234.5 EUR` or `€90,00`.
///
/// The euro sign and the literal `EUR` are removed. Commas are treated as thousands separators,
/// unless the value has no decimal point and its last comma is followed by only one or two digits,
/// in which case that comma is the decimal separator.
///
/// # Returns
///
/// The value, or `None` if it is not a finite number.
pub fn parse_currency_value(field: &str) -> Option<f64> {
    let cleaned = field.replace('€', "").replace("EUR", "");
    let cleaned = normalise_separators(cleaned.trim());
    let value: f64 = cleaned.trim().parse().ok()?;

    value.is_finite().then_some(value)
}

/// Remove thousands separators and convert a decimal comma to a decimal point
fn normalise_separators(value: &str) -> String {
    if !value.contains('.')
        && let Some(pos) = value.rfind(',')
    {
        let decimals = &value[pos + 1..];
        if (1..=2).contains(&decimals.len()) && decimals.chars().all(|c| c.is_ascii_digit()) {
            return format!("{}.{decimals}", value[..pos].replace(',', ""));
        }
    }

    value.replace(',', "")
}
