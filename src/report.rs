//! Executive reports on future CBAM exposure.
use crate::calculator::CostSummary;
use crate::emissions::EmissionsAnalysis;
use crate::forecast::{CostForecastPoint, ForecastTable, parse_cost_forecast_table};
use crate::llm::TextGenerator;
use crate::prompt::build_report_prompt;
use crate::units::{EmissionIntensity, Money, Tonnes};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use itertools::Itertools;
use log::{info, warn};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Matches the year in a period label such as "Q1 2025"
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("Invalid year regex"));

/// Quantile of forecast costs at or above which a period is high risk
const HIGH_RISK_QUANTILE: f64 = 0.9;

/// Relative change in forecast price (%) beyond which prices are trending
const TREND_THRESHOLD_PERCENT: f64 = 10.0;

/// How exposed a period is relative to the rest of the forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display)]
pub enum RiskLevel {
    /// Below the mean forecast cost
    #[strum(to_string = "Low Risk")]
    Low,
    /// At or above the mean forecast cost
    #[strum(to_string = "Medium Risk")]
    Medium,
    /// At or above the 90th percentile of forecast costs
    #[strum(to_string = "High Risk")]
    High,
}

/// A forecast period with its risk level
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessedCost {
    /// The forecast cost
    pub point: CostForecastPoint,
    /// The risk level of the period
    pub risk_level: RiskLevel,
}

/// The `q`th quantile of `values`, interpolating linearly between closest ranks
fn quantile(values: &[f64], q: f64) -> f64 {
    let sorted = values
        .iter()
        .copied()
        .sorted_by(f64::total_cmp)
        .collect_vec();
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor();
    let upper = pos.ceil();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (lower_value, upper_value) = (sorted[lower as usize], sorted[upper as usize]);
    lower_value + (upper_value - lower_value) * (pos - lower)
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len() as f64;
    values.sum::<f64>() / n
}

/// Assign a risk level to each forecast period based on its cost
pub fn assess_risk(costs: Vec<CostForecastPoint>) -> Vec<RiskAssessedCost> {
    if costs.is_empty() {
        return Vec::new();
    }

    let values = costs.iter().map(|point| point.derived_cost).collect_vec();
    let high_threshold = quantile(&values, HIGH_RISK_QUANTILE);
    let mean_cost = mean(values.iter().copied());

    costs
        .into_iter()
        .map(|point| {
            let risk_level = if point.derived_cost >= high_threshold {
                RiskLevel::High
            } else if point.derived_cost >= mean_cost {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            };
            RiskAssessedCost { point, risk_level }
        })
        .collect()
}

/// Direction of forecast carbon prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum PriceTrend {
    /// Prices rise by more than 10%
    Rising,
    /// Prices fall by more than 10%
    Falling,
    /// Prices change by 10% or less
    Stable,
}

/// Summary of a carbon price forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceForecastMetrics {
    /// Lowest forecast price
    pub min: f64,
    /// Highest forecast price
    pub max: f64,
    /// Mean forecast price
    pub average: f64,
    /// Price in the first period
    pub start: f64,
    /// Price in the last period
    pub end: f64,
    /// Percentage change from the first to the last period (`None` if the start price is zero)
    pub change_percent: Option<f64>,
    /// Overall direction of prices (`None` if the start price is zero)
    pub trend: Option<PriceTrend>,
}

impl PriceForecastMetrics {
    /// Summarise a price forecast, returning `None` if it is empty
    pub fn from_forecast(forecast: &ForecastTable) -> Option<Self> {
        let start = forecast.first()?.value;
        let end = forecast.last()?.value;
        let values = forecast.iter().map(|point| point.value);
        let change_percent = (start != 0.0).then(|| (end - start) / start * 100.0);
        let trend = change_percent.map(|change| {
            if change > TREND_THRESHOLD_PERCENT {
                PriceTrend::Rising
            } else if change < -TREND_THRESHOLD_PERCENT {
                PriceTrend::Falling
            } else {
                PriceTrend::Stable
            }
        });

        Some(Self {
            min: values.clone().fold(f64::INFINITY, f64::min),
            max: values.clone().fold(f64::NEG_INFINITY, f64::max),
            average: mean(values),
            start,
            end,
            change_percent,
            trend,
        })
    }
}

/// Total forecast cost for a calendar year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyCost {
    /// The year, as written in the period labels
    pub year: String,
    /// Sum of forecast costs for periods in the year
    pub total: f64,
}

/// Summary of a cost forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostForecastMetrics {
    /// Sum of forecast costs over all periods
    pub total: f64,
    /// Mean cost per period
    pub average: f64,
    /// Lowest cost in any period
    pub min: f64,
    /// Highest cost in any period
    pub max: f64,
    /// The first period with the highest cost
    pub critical_period: String,
    /// Totals for each year found in the period labels, in order of year
    pub yearly_totals: Vec<YearlyCost>,
    /// The year with the highest total, if any period label contains a year
    pub highest_year: Option<YearlyCost>,
}

impl CostForecastMetrics {
    /// Summarise a cost forecast, returning `None` if it is empty
    pub fn from_costs(costs: &[RiskAssessedCost]) -> Option<Self> {
        let first = costs.first()?;
        let values = costs.iter().map(|cost| cost.point.derived_cost);

        // Take the first period on ties
        let critical = costs.iter().fold(first, |best, cost| {
            if cost.point.derived_cost > best.point.derived_cost {
                cost
            } else {
                best
            }
        });

        let mut by_year = BTreeMap::new();
        for cost in costs {
            if let Some(year) = YEAR.find(&cost.point.period_label) {
                *by_year.entry(year.as_str().to_string()).or_insert(0.0) += cost.point.derived_cost;
            }
        }
        let yearly_totals = by_year
            .into_iter()
            .map(|(year, total)| YearlyCost { year, total })
            .collect_vec();
        let highest_year = yearly_totals
            .iter()
            .fold(None::<&YearlyCost>, |best, year| match best {
                Some(best) if best.total >= year.total => Some(best),
                _ => Some(year),
            })
            .cloned();

        Some(Self {
            total: values.clone().sum(),
            average: mean(values.clone()),
            min: values.clone().fold(f64::INFINITY, f64::min),
            max: values.fold(f64::NEG_INFINITY, f64::max),
            critical_period: critical.point.period_label.clone(),
            yearly_totals,
            highest_year,
        })
    }
}

/// Figures included in an executive report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetrics {
    /// Product description
    pub product: String,
    /// Product category
    pub category: String,
    /// Quantity imported
    pub quantity: Tonnes,
    /// Total embedded emissions per tonne of product
    pub total_intensity: EmissionIntensity,
    /// CBAM cost at the reference carbon price
    pub current_cost: Money,
    /// Summary of the carbon price forecast (`None` if there is no forecast)
    pub price_forecast: Option<PriceForecastMetrics>,
    /// Summary of the cost forecast (`None` if there is no forecast)
    pub cost_forecast: Option<CostForecastMetrics>,
}

impl ReportMetrics {
    /// Calculate report figures
    pub fn new(
        summary: &CostSummary,
        ets_forecast: &ForecastTable,
        costs: &[RiskAssessedCost],
    ) -> Self {
        Self {
            product: summary.product.clone(),
            category: summary.category.clone(),
            quantity: summary.quantity,
            total_intensity: summary.result.total_intensity,
            current_cost: summary.result.gross_cost,
            price_forecast: PriceForecastMetrics::from_forecast(ets_forecast),
            cost_forecast: CostForecastMetrics::from_costs(costs),
        }
    }
}

/// A generated executive report
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutiveReport {
    /// Figures the report is based on
    pub metrics: ReportMetrics,
    /// Forecast costs with their risk levels
    pub costs: Vec<RiskAssessedCost>,
    /// The report itself
    pub text: String,
    /// When the report was generated
    pub timestamp: DateTime<Local>,
}

impl ExecutiveReport {
    /// Write the report to a plain-text file
    pub fn save(&self, file_path: &Path) -> Result<()> {
        let rule = "=".repeat(70);
        let contents = format!(
            "{rule}\nCBAM EXECUTIVE REPORT\nGenerated: {}\n{rule}\n\n{}\n",
            self.timestamp.to_rfc3339(),
            self.text
        );
        fs::write(file_path, contents)
            .with_context(|| format!("Failed to write report to {}", file_path.display()))
    }
}

/// Generate an executive report from cost and price forecasts.
///
/// # Arguments
///
/// * `generator` - Model used to write the report
/// * `model` - Name of the model
/// * `summary` - Current CBAM cost of the import
/// * `ets_forecast` - Carbon price forecast
/// * `cost_response` - Raw model response containing the cost forecast table
/// * `emissions` - Installation emissions and reduction scenarios, if available
pub fn generate_report(
    generator: &dyn TextGenerator,
    model: &str,
    summary: &CostSummary,
    ets_forecast: &ForecastTable,
    cost_response: &str,
    emissions: Option<&EmissionsAnalysis>,
) -> Result<ExecutiveReport> {
    let costs = assess_risk(parse_cost_forecast_table(cost_response));
    if costs.is_empty() {
        warn!("No cost forecast could be read from the model response");
    }

    let metrics = ReportMetrics::new(summary, ets_forecast, &costs);
    let prompt = build_report_prompt(&metrics, ets_forecast, &costs, emissions);
    info!("Generating executive report...");
    let text = generator
        .generate(model, &prompt)
        .context("Failed to generate executive report")?;

    Ok(ExecutiveReport {
        metrics,
        costs,
        text,
        timestamp: Local::now(),
    })
}
