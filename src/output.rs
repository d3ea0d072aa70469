//! The module responsible for writing output data to disk.
use crate::analysis::AnalysisResult;
use crate::forecast::ForecastPoint;
use crate::report::{RiskAssessedCost, RiskLevel};
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which product-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "cbam_results";

/// The output file name for the current cost
const COST_SUMMARY_FILE_NAME: &str = "cost_summary.toml";

/// The output file name for historical price statistics
const ETS_STATISTICS_FILE_NAME: &str = "ets_statistics.toml";

/// The output file name for forecast carbon prices
const ETS_FORECAST_FILE_NAME: &str = "ets_forecast.csv";

/// The output file name for forecast CBAM costs
const COST_FORECAST_FILE_NAME: &str = "cost_forecast.csv";

/// The output file name for the model's raw cost forecast
const LLM_COST_FORECAST_FILE_NAME: &str = "llm_cost_forecast.txt";

/// The output file name for installation emissions
const EMISSIONS_SUMMARY_FILE_NAME: &str = "emissions_summary.toml";

/// The output file name for the executive report
const REPORT_FILE_NAME: &str = "report.txt";

/// Get the default output directory for the given product code
pub fn get_output_dir(product_code: &str) -> PathBuf {
    let product_code = product_code.trim();
    [OUTPUT_DIRECTORY_ROOT, product_code].iter().collect()
}

/// Create a new output directory.
///
/// If the directory exists and is not empty, it is only reused (after deleting its contents) if
/// `allow_overwrite` is set.
///
/// # Returns
///
/// Whether an existing directory was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Empty folder
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the cost forecast CSV file
#[derive(Serialize, Debug, PartialEq)]
struct CostForecastRow<'a> {
    period: &'a str,
    ets_price: f64,
    cbam_cost: f64,
    risk_level: RiskLevel,
}

impl<'a> From<&'a RiskAssessedCost> for CostForecastRow<'a> {
    fn from(cost: &'a RiskAssessedCost) -> Self {
        Self {
            period: &cost.point.period_label,
            ets_price: cost.point.reference_value,
            cbam_cost: cost.point.derived_cost,
            risk_level: cost.risk_level,
        }
    }
}

/// Represents a row in the carbon price forecast CSV file
#[derive(Serialize, Debug, PartialEq)]
struct EtsForecastRow<'a> {
    period: &'a str,
    ets_price: f64,
}

impl<'a> From<&'a ForecastPoint> for EtsForecastRow<'a> {
    fn from(point: &'a ForecastPoint) -> Self {
        Self {
            period: &point.period_label,
            ets_price: point.value,
        }
    }
}

/// Write `rows` to a CSV file
fn write_csv<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write `value` to a TOML file
fn write_toml<T: Serialize>(file_path: &Path, value: &T) -> Result<()> {
    let contents = toml::to_string(value)?;
    fs::write(file_path, contents)?;

    Ok(())
}

/// Write the results of an analysis to `output_path`
pub fn write_analysis(output_path: &Path, result: &AnalysisResult) -> Result<()> {
    let path = |file_name| output_path.join(file_name);
    let err_msg = |file_name| format!("Failed to write {file_name}");

    write_toml(&path(COST_SUMMARY_FILE_NAME), &result.summary)
        .with_context(|| err_msg(COST_SUMMARY_FILE_NAME))?;
    write_toml(&path(ETS_STATISTICS_FILE_NAME), &result.statistics)
        .with_context(|| err_msg(ETS_STATISTICS_FILE_NAME))?;
    write_csv(
        &path(ETS_FORECAST_FILE_NAME),
        result.ets_forecast.iter().map(EtsForecastRow::from),
    )
    .with_context(|| err_msg(ETS_FORECAST_FILE_NAME))?;
    write_csv(
        &path(COST_FORECAST_FILE_NAME),
        result.report.costs.iter().map(CostForecastRow::from),
    )
    .with_context(|| err_msg(COST_FORECAST_FILE_NAME))?;
    fs::write(path(LLM_COST_FORECAST_FILE_NAME), &result.cost_response)
        .with_context(|| err_msg(LLM_COST_FORECAST_FILE_NAME))?;
    if let Some(emissions) = &result.emissions {
        write_toml(&path(EMISSIONS_SUMMARY_FILE_NAME), emissions)
            .with_context(|| err_msg(EMISSIONS_SUMMARY_FILE_NAME))?;
    }
    result.report.save(&path(REPORT_FILE_NAME))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CostSummary;
    use crate::emissions::{EmissionInputs, EmissionsAnalysis};
    use crate::ets::{PricePoint, PriceStatistics};
    use crate::fixture::{assert_error, pig_iron_summary, steel_emission_inputs};
    use crate::forecast::CostForecastPoint;
    use crate::report::{ExecutiveReport, ReportMetrics};
    use crate::units::MoneyPerEmissions;
    use chrono::{Local, NaiveDate};
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_get_output_dir() {
        assert_eq!(
            get_output_dir(" 7201 "),
            PathBuf::from("cbam_results").join("7201")
        );
    }

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("results").join("7201");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        assert!(!create_output_directory(temp_dir.path(), false).unwrap());
        assert!(temp_dir.path().is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_directory_with_files() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("report.txt");
        fs::write(&file_path, "old report").unwrap();

        assert_error!(
            create_output_directory(temp_dir.path(), false),
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );
        assert!(file_path.is_file());

        assert!(create_output_directory(temp_dir.path(), true).unwrap());
        assert!(temp_dir.path().is_dir());
        assert!(!file_path.exists());
    }

    fn analysis_result(
        summary: CostSummary,
        emissions: Option<EmissionsAnalysis>,
    ) -> AnalysisResult {
        let points = vec![
            PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                price: 80.0,
            },
            PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                price: 82.0,
            },
        ];
        let ets_forecast = vec![ForecastPoint {
            period_label: "Q1 2025".into(),
            value: 90.0,
        }];
        let costs = vec![RiskAssessedCost {
            point: CostForecastPoint {
                period_label: "Q1 2025".into(),
                reference_value: 90.0,
                derived_cost: 196_200.0,
            },
            risk_level: RiskLevel::High,
        }];

        AnalysisResult {
            report: ExecutiveReport {
                metrics: ReportMetrics::new(&summary, &ets_forecast, &costs),
                costs,
                text: "Report".into(),
                timestamp: Local::now(),
            },
            summary,
            statistics: PriceStatistics::from_series(&points).unwrap(),
            ets_forecast,
            cost_response: "Q1 2025 | 90 | 196200".into(),
            emissions,
        }
    }

    fn read_table(file_path: &Path) -> toml::Table {
        toml::from_str(&fs::read_to_string(file_path).unwrap()).unwrap()
    }

    #[rstest]
    fn test_write_analysis(pig_iron_summary: CostSummary) {
        let dir = tempdir().unwrap();
        write_analysis(dir.path(), &analysis_result(pig_iron_summary, None)).unwrap();

        let summary = read_table(&dir.path().join(COST_SUMMARY_FILE_NAME));
        assert_eq!(summary["product_code"].as_str(), Some("7201"));
        assert!(summary.contains_key("gross_cost"));

        let statistics = read_table(&dir.path().join(ETS_STATISTICS_FILE_NAME));
        assert_eq!(statistics["count"].as_integer(), Some(2));
        assert!(!statistics.contains_key("recent"));

        assert_eq!(
            fs::read_to_string(dir.path().join(ETS_FORECAST_FILE_NAME)).unwrap(),
            "period,ets_price\nQ1 2025,90.0\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join(COST_FORECAST_FILE_NAME)).unwrap(),
            "period,ets_price,cbam_cost,risk_level\nQ1 2025,90.0,196200.0,High\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join(LLM_COST_FORECAST_FILE_NAME)).unwrap(),
            "Q1 2025 | 90 | 196200"
        );
        assert!(dir.path().join(REPORT_FILE_NAME).is_file());
        assert!(!dir.path().join(EMISSIONS_SUMMARY_FILE_NAME).exists());
    }

    #[rstest]
    fn test_write_analysis_with_emissions(
        pig_iron_summary: CostSummary,
        steel_emission_inputs: EmissionInputs,
    ) {
        let dir = tempdir().unwrap();
        let emissions = EmissionsAnalysis::new(&steel_emission_inputs, MoneyPerEmissions(85.0));
        write_analysis(
            dir.path(),
            &analysis_result(pig_iron_summary, Some(emissions)),
        )
        .unwrap();

        let emissions = read_table(&dir.path().join(EMISSIONS_SUMMARY_FILE_NAME));
        assert!(emissions.contains_key("summary"));
        assert_eq!(emissions["scenarios"].as_array().map(Vec::len), Some(3));
    }
}
