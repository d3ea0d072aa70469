//! The full analysis pipeline: current cost, carbon price forecast, cost forecast and report.
use crate::calculator::{CostSummary, get_summary_with_foreign_price};
use crate::emissions::{EmissionInputs, EmissionsAnalysis};
use crate::ets::{PriceHistory, PriceStatistics};
use crate::forecast::{ForecastTable, parse_forecast_table};
use crate::llm::TextGenerator;
use crate::product::ProductTable;
use crate::prompt::{FORECAST_YEARS, build_cost_forecast_prompt, build_price_forecast_prompt};
use crate::report::{ExecutiveReport, generate_report};
use crate::settings::Settings;
use crate::units::{MoneyPerEmissions, Tonnes};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

/// What to analyse
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// CN code of the imported product
    pub product_code: String,
    /// Quantity imported
    pub quantity: Tonnes,
    /// Current EU ETS carbon price
    pub carbon_price: MoneyPerEmissions,
    /// Carbon price already paid in the country of origin
    pub foreign_carbon_price: MoneyPerEmissions,
    /// CSV file of historical EU ETS prices
    pub history_path: PathBuf,
    /// TOML file of installation activity data, for the Scope 1/2 analysis
    pub emissions_path: Option<PathBuf>,
}

/// Everything produced by a full analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Current CBAM cost
    pub summary: CostSummary,
    /// Statistics of the historical carbon price
    pub statistics: PriceStatistics,
    /// Forecast carbon prices
    pub ets_forecast: ForecastTable,
    /// The model's cost forecast, as returned
    pub cost_response: String,
    /// Installation emissions and reduction scenarios
    pub emissions: Option<EmissionsAnalysis>,
    /// The executive report
    pub report: ExecutiveReport,
}

/// Run the full analysis.
///
/// # Arguments
///
/// * `request` - The product and input files to analyse
/// * `table` - Reference emission intensities
/// * `generator` - Model used for forecasts and the report
/// * `settings` - Program settings
///
/// # Returns
///
/// The results of the analysis or `None` if the product code is not in `table`.
pub fn run_full_analysis(
    request: &AnalysisRequest,
    table: &ProductTable,
    generator: &dyn TextGenerator,
    settings: &Settings,
) -> Result<Option<AnalysisResult>> {
    let Some(summary) = get_summary_with_foreign_price(
        table,
        &request.product_code,
        request.quantity,
        request.carbon_price,
        request.foreign_carbon_price,
    ) else {
        warn!("Product code {} not found", request.product_code);
        return Ok(None);
    };
    info!(
        "Current CBAM cost for {} t of {}: {} EUR",
        summary.quantity, summary.product, summary.result.gross_cost
    );

    let emissions = request
        .emissions_path
        .as_deref()
        .map(|path| -> Result<_> {
            let inputs = EmissionInputs::from_toml(path)?;
            Ok(EmissionsAnalysis::new(&inputs, request.carbon_price))
        })
        .transpose()
        .context("Failed to analyse installation emissions")?;

    let history = PriceHistory::from_csv(&request.history_path, settings.history_limit)
        .context("Failed to load carbon price history")?;
    let statistics = PriceStatistics::from_series(history.points())?;

    info!("Forecasting EU ETS prices...");
    let prompt = build_price_forecast_prompt(&statistics, &FORECAST_YEARS);
    let price_response = generator
        .generate(&settings.forecast_model, &prompt)
        .context("Failed to forecast carbon prices")?;
    let ets_forecast = parse_forecast_table(&price_response);
    if ets_forecast.is_empty() {
        warn!("No price forecast could be read from the model response");
    } else {
        info!("Read {} forecast carbon prices", ets_forecast.len());
    }

    info!("Forecasting CBAM costs...");
    let prompt = build_cost_forecast_prompt(&summary, &ets_forecast, &FORECAST_YEARS);
    let cost_response = generator
        .generate(&settings.forecast_model, &prompt)
        .context("Failed to forecast CBAM costs")?;

    let report = generate_report(
        generator,
        &settings.report_model,
        &summary,
        &ets_forecast,
        &cost_response,
        emissions.as_ref(),
    )?;

    Ok(Some(AnalysisResult {
        summary,
        statistics,
        ets_forecast,
        cost_response,
        emissions,
        report,
    }))
}
