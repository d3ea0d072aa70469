//! Requests sent to text-generation models.
//!
//! Every builder is a pure function of its inputs. The tables the model is asked to reply with
//! are in the format understood by [`crate::forecast`].
use crate::calculator::CostSummary;
use crate::emissions::{EmissionsAnalysis, OptimisationScenario, ScenarioKind, SourceEmissions};
use crate::ets::PriceStatistics;
use crate::forecast::ForecastTable;
use crate::report::{CostForecastMetrics, PriceForecastMetrics, ReportMetrics, RiskAssessedCost};
use itertools::Itertools;
use std::ops::RangeInclusive;

/// The years covered by forecasts
pub const FORECAST_YEARS: RangeInclusive<u32> = 2025..=2030;

/// Header of the price forecast table
const PRICE_TABLE_HEADER: &str = "Quarter | Forecasted Value";

/// Header of the cost forecast table
const COST_TABLE_HEADER: &str = "Quarter | Forecasted ETS Price (EUR) | Estimated CBAM Cost (EUR)";

/// Placeholder for figures which are not available
const NOT_AVAILABLE: &str = "N/A";

/// Describe a range of years in quarters, e.g. "Q1 2025 to Q4 2030"
fn quarter_range(years: &RangeInclusive<u32>) -> String {
    format!("Q1 {} to Q4 {}", years.start(), years.end())
}

/// Render a price forecast as a pipe-separated table
pub fn format_forecast_table(forecast: &ForecastTable) -> String {
    let rows = forecast
        .iter()
        .map(|point| format!("{} | {}", point.period_label, point.value));

    std::iter::once(PRICE_TABLE_HEADER.to_string())
        .chain(rows)
        .join("\n")
}

/// Build a request for a quarterly carbon price forecast from historical statistics.
///
/// The model is asked to extrapolate from the numbers alone.
pub fn build_price_forecast_prompt(
    stats: &PriceStatistics,
    horizon: &RangeInclusive<u32>,
) -> String {
    let recent = stats
        .recent
        .iter()
        .map(|point| format!("{} | {:.2}", point.date, point.price))
        .join("\n");

    format!(
        "\
You are an agent that works only with numerical time series.
You know nothing about finance, carbon markets or the real world. You can only analyse the
mathematical patterns in the data you are given.

STATISTICAL SUMMARY OF THE SERIES

Last value: {last:.2}
Mean value: {mean:.2}
Mean change per time step (drift): {drift:.4}
Standard deviation (volatility): {std_dev:.4}
Minimum observed value: {min:.2}
Maximum observed value: {max:.2}

RECENT OBSERVATIONS

{recent}

ANALYSIS

1. Decide whether the series shows a trend or fluctuates around its mean, and whether its
   volatility is constant.
2. Forecasts must follow x(t+1) = x(t) + drift ± volatility.
3. Forecasts must not be a straight line or unrealistically smooth, but must not jump outside
   the historical range either.
4. Do not use any outside knowledge about the future.

TASK

Forecast the quarterly values from {range}.
Reply with a table with one row per quarter in exactly this format:

{header}",
        last = stats.last_price,
        mean = stats.mean_price,
        drift = stats.avg_change,
        std_dev = stats.std_dev,
        min = stats.min_price,
        max = stats.max_price,
        range = quarter_range(horizon),
        header = PRICE_TABLE_HEADER,
    )
}

/// Build a request to turn a carbon price forecast into a CBAM cost forecast for an import
pub fn build_cost_forecast_prompt(
    summary: &CostSummary,
    ets_forecast: &ForecastTable,
    horizon: &RangeInclusive<u32>,
) -> String {
    format!(
        "\
You are an EU CBAM financial forecasting assistant.

Current import:
Product: {product}
Sector: {category}
Import volume: {quantity} tonnes
Total emission intensity: {intensity:.3} tCO2/t
Current CBAM cost: €{cost:.2}

Use exactly these forecast ETS prices:
{table}

Calculate the CBAM cost for each quarter from {range} using the prices above:

CBAM cost = import volume × total emission intensity × forecast price

Do not make up your own price estimates.
Reply with a table with one row per quarter in exactly this format:

{header}",
        product = summary.product,
        category = summary.category,
        quantity = summary.quantity,
        intensity = summary.result.total_intensity.value(),
        cost = summary.result.gross_cost.value(),
        table = format_forecast_table(ets_forecast),
        range = quarter_range(horizon),
        header = COST_TABLE_HEADER,
    )
}

fn format_sources(sources: &[SourceEmissions]) -> String {
    sources
        .iter()
        .filter(|source| source.emissions.value() > 0.0)
        .map(|s| format!("  - {}: {:.2} tCO2", s.source, s.emissions.value()))
        .join("\n")
}

/// Describe installation emissions for the report request
fn format_emissions(analysis: &EmissionsAnalysis) -> String {
    let summary = &analysis.summary;
    let mut sections = Vec::new();

    if let Some(s1) = &summary.scope1 {
        let shares = &s1.breakdown_percent;
        sections.push(format!(
            "\
Scope 1 (direct) emissions: {total:.2} tCO2
- Fuel: {fuel:.2} tCO2 ({fuel_pc:.1}%)
{fuel_sources}
- Mobile: {mobile:.2} tCO2 ({mobile_pc:.1}%)
- Process: {process:.2} tCO2 ({process_pc:.1}%)
{process_sources}
- Thermal systems: {thermal:.2} tCO2 ({thermal_pc:.1}%)
Emission intensity: {intensity:.2} tCO2 per tonne of output",
            total = s1.total.value(),
            fuel = s1.total_fuel.value(),
            fuel_pc = shares.fuel,
            fuel_sources = format_sources(&s1.fuel),
            mobile = s1.total_mobile.value(),
            mobile_pc = shares.mobile,
            process = s1.total_process.value(),
            process_pc = shares.process,
            process_sources = format_sources(&s1.process),
            thermal = s1.total_thermal.value(),
            thermal_pc = shares.thermal,
            intensity = s1.intensity.value(),
        ));
    }

    if let Some(s2) = &summary.scope2 {
        sections.push(format!(
            "\
Scope 2 (electricity) emissions: {total:.2} tCO2
- Source: {description}
- Consumption: {consumption:.2} MWh
- Grid emission factor: {factor:.3} kgCO2/kWh",
            total = s2.total.value(),
            description = s2.description,
            consumption = s2.consumption_mwh,
            factor = s2.grid_emission_factor,
        ));
    }

    if sections.is_empty() {
        return "No installation emissions data was provided.".to_string();
    }

    sections.push(format!(
        "Total Scope 1 and 2 emissions: {:.2} tCO2",
        summary.total.value()
    ));
    sections.join("\n\n")
}

fn format_scenario(scenario: &OptimisationScenario) -> String {
    let mut lines = vec![
        scenario.name.to_string(),
        format!(
            "- Emission saving: {:.2} tCO2/year",
            scenario.emission_saving.value()
        ),
        format!(
            "- Annual CBAM saving: €{:.2}",
            scenario.annual_saving.value()
        ),
        format!("- Investment needed: €{:.2}", scenario.investment.value()),
        format!("- Payback: {:.1} years", scenario.roi_years),
    ];
    if let Some(percent) = scenario.emission_reduction_percent {
        lines.push(format!("- Emission reduction: {percent:.1}%"));
    }
    if scenario.kind != ScenarioKind::Combined {
        lines.push(format!("- Measures: {}", scenario.measures.join(", ")));
    }

    lines.join("\n")
}

fn format_scenarios(scenarios: &[OptimisationScenario]) -> String {
    if scenarios.is_empty() {
        return "No optimisation scenarios were calculated.".to_string();
    }

    scenarios.iter().map(format_scenario).join("\n\n")
}

/// Describe the carbon price forecast for the report request
fn format_price_metrics(price: Option<&PriceForecastMetrics>) -> String {
    let Some(price) = price else {
        return format!("Forecast prices are {NOT_AVAILABLE}.");
    };

    let trend = match (price.trend, price.change_percent) {
        (Some(trend), Some(change)) => format!("{trend} ({change:+.1}%)"),
        _ => NOT_AVAILABLE.to_string(),
    };
    format!(
        "- Minimum: €{:.2}\n- Maximum: €{:.2}\n- Average: €{:.2}\n- Trend: {trend}",
        price.min, price.max, price.average
    )
}

/// Render the cost forecast table and describe its figures for the report request
fn format_cost_metrics(
    cost: Option<&CostForecastMetrics>,
    costs: &[RiskAssessedCost],
) -> (String, String) {
    let Some(cost) = cost else {
        return (
            "No data available".to_string(),
            format!("Cost projections are {NOT_AVAILABLE}."),
        );
    };

    let table = std::iter::once(format!("{COST_TABLE_HEADER} | Risk"))
        .chain(costs.iter().map(|cost| {
            format!(
                "{} | {:.2} | {:.2} | {}",
                cost.point.period_label,
                cost.point.reference_value,
                cost.point.derived_cost,
                cost.risk_level
            )
        }))
        .join("\n");
    let yearly = cost
        .yearly_totals
        .iter()
        .map(|year| format!("{}: €{:.0}", year.year, year.total))
        .join("\n");
    let highest_year = cost.highest_year.as_ref().map_or_else(
        || NOT_AVAILABLE.to_string(),
        |year| format!("{} (€{:.2})", year.year, year.total),
    );
    let stats = format!(
        "\
- Total CBAM cost: €{total:.2}
- Average cost per quarter: €{average:.2}
- Most expensive period: {critical} (€{max:.2})

Yearly CBAM costs:
{yearly}

Most expensive year: {highest_year}",
        total = cost.total,
        average = cost.average,
        critical = cost.critical_period,
        max = cost.max,
    );

    (table, stats)
}

/// Build a request for an executive report.
///
/// # Arguments
///
/// * `metrics` - Figures derived from the forecasts
/// * `ets_forecast` - Carbon price forecast
/// * `costs` - Cost forecast with risk levels
/// * `emissions` - Installation emissions and reduction scenarios, if available
pub fn build_report_prompt(
    metrics: &ReportMetrics,
    ets_forecast: &ForecastTable,
    costs: &[RiskAssessedCost],
    emissions: Option<&EmissionsAnalysis>,
) -> String {
    let price_stats = format_price_metrics(metrics.price_forecast.as_ref());
    let (cost_table, cost_stats) = format_cost_metrics(metrics.cost_forecast.as_ref(), costs);

    let (emissions_text, scenarios_text) = emissions.map_or_else(
        || {
            (
                "No installation emissions data was provided.".to_string(),
                "No optimisation scenarios were calculated.".to_string(),
            )
        },
        |analysis| {
            (
                format_emissions(analysis),
                format_scenarios(&analysis.scenarios),
            )
        },
    );

    format!(
        "\
You are an EU CBAM financial adviser. Using the data below, write a professional report for
senior management.

PRODUCT
- Product: {product}
- Sector: {category}
- Import volume: {quantity:.0} tonnes
- Emission intensity: {intensity:.2} tCO2/t
- Current CBAM cost: €{current_cost:.2}

ETS PRICE FORECAST

{ets_table}

{price_stats}

CBAM COST PROJECTIONS

{cost_table}

{cost_stats}

EMISSIONS PROFILE (SCOPE 1 AND 2)

{emissions_text}

OPTIMISATION SCENARIOS

{scenarios_text}

TASK

Write an executive report with the following sections, quoting the figures above wherever they
support a point (e.g. \"current use: X → target: Y → saving: Z tCO2\"):

1. Executive summary: total CBAM exposure, the emissions profile and the critical periods.
2. Financial risk and ETS market analysis: cumulative effect of carbon prices on costs, budget
   volatility and possible hedging strategies.
3. Emissions profile: the largest emission sources and their share of the total.
4. Optimisation and green finance: savings, investment and payback for each scenario.
5. Strategic roadmap: short-term (2025-2026), medium-term (2027-2028) and long-term actions.
6. Net financial impact and conclusion.

Use a professional tone, markdown headings and bold for key figures.",
        product = metrics.product,
        category = metrics.category,
        quantity = metrics.quantity.value(),
        intensity = metrics.total_intensity.value(),
        current_cost = metrics.current_cost.value(),
        ets_table = format_forecast_table(ets_forecast),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emissions::EmissionInputs;
    use crate::ets::{PricePoint, PriceStatistics};
    use crate::fixture::{pig_iron_summary, steel_emission_inputs};
    use crate::forecast::{ForecastPoint, parse_forecast_table};
    use crate::report::assess_risk;
    use crate::units::MoneyPerEmissions;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn forecast() -> ForecastTable {
        vec![
            ForecastPoint {
                period_label: "Q1 2025".into(),
                value: 85.5,
            },
            ForecastPoint {
                period_label: "Q2 2025".into(),
                value: 90.0,
            },
        ]
    }

    #[test]
    fn test_format_forecast_table_round_trip() {
        let table = format_forecast_table(&forecast());
        assert_eq!(
            table,
            "Quarter | Forecasted Value\nQ1 2025 | 85.5\nQ2 2025 | 90"
        );
        assert_eq!(parse_forecast_table(&table), forecast());
    }

    #[test]
    fn test_build_price_forecast_prompt() {
        let points = (1..=3)
            .map(|day| PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
                price: 70.0 + f64::from(day),
            })
            .collect_vec();
        let stats = PriceStatistics::from_series(&points).unwrap();
        let prompt = build_price_forecast_prompt(&stats, &FORECAST_YEARS);

        assert!(prompt.contains("Last value: 73.00"));
        assert!(prompt.contains("Mean value: 72.00"));
        assert!(prompt.contains("2024-05-01 | 71.00\n2024-05-02 | 72.00\n2024-05-03 | 73.00"));
        assert!(prompt.contains("Q1 2025 to Q4 2030"));
        assert!(prompt.ends_with(PRICE_TABLE_HEADER));
    }

    #[rstest]
    fn test_build_cost_forecast_prompt(pig_iron_summary: CostSummary) {
        let prompt = build_cost_forecast_prompt(&pig_iron_summary, &forecast(), &(2026..=2027));
        assert!(prompt.contains("Product: Pig iron"));
        assert!(prompt.contains("Import volume: 1000 tonnes"));
        assert!(prompt.contains("Current CBAM cost: €175950.00"));
        assert!(prompt.contains("Q1 2025 | 85.5\nQ2 2025 | 90"));
        assert!(prompt.contains("Q1 2026 to Q4 2027"));
        assert!(prompt.ends_with(COST_TABLE_HEADER));

        // The forecast is the only table the model should echo back as prices
        assert_eq!(parse_forecast_table(&prompt), forecast());
    }

    #[rstest]
    fn test_build_report_prompt(
        pig_iron_summary: CostSummary,
        steel_emission_inputs: EmissionInputs,
    ) {
        let costs = assess_risk(vec![crate::forecast::CostForecastPoint {
            period_label: "Q1 2025".into(),
            reference_value: 85.5,
            derived_cost: 176_985.0,
        }]);
        let metrics = ReportMetrics::new(&pig_iron_summary, &forecast(), &costs);
        let analysis = EmissionsAnalysis::new(&steel_emission_inputs, MoneyPerEmissions(85.0));
        let prompt = build_report_prompt(&metrics, &forecast(), &costs, Some(&analysis));

        assert!(prompt.contains("- Product: Pig iron"));
        assert!(prompt.contains("Q1 2025 | 85.50 | 176985.00 | High Risk"));
        assert!(prompt.contains("2025: €176985"));
        assert!(prompt.contains("Trend: Stable (+5.3%)"));
        assert!(prompt.contains("Scope 1 (direct) emissions: 2169.40 tCO2"));
        assert!(prompt.contains("  - coking_coal: 1600.00 tCO2"));
        assert!(prompt.contains("Scope 2 (electricity) emissions: 800.00 tCO2"));
        assert!(prompt.contains("Combined transition strategy"));
    }

    #[rstest]
    fn test_build_report_prompt_no_data(pig_iron_summary: CostSummary) {
        let metrics = ReportMetrics::new(&pig_iron_summary, &Vec::new(), &[]);
        let prompt = build_report_prompt(&metrics, &Vec::new(), &[], None);
        assert!(prompt.contains("No data available"));
        assert!(prompt.contains("Forecast prices are N/A."));
        assert!(prompt.contains("No installation emissions data was provided."));
        assert!(prompt.contains("No optimisation scenarios were calculated."));
    }
}
