//! Integration tests for the `parse` command.
use cbam::cli::{handle_parse_command, write_parsed_forecast};
use cbam::settings::Settings;
use std::fs;
use tempfile::tempdir;

const RESPONSE: &str = "Here is the forecast:\n\
    | Quarter | Forecasted ETS Price (EUR) | Estimated CBAM Cost (EUR) |\n\
    |---|---|---|\n\
    | Q1 2025 | €90.00 | €186,300.00 |\n\
    | Q2 2025 | 91,50 | 189,405.00 |\n\
    | Q3 2025 | TBC | TBC |\n";

/// An integration test for the `parse` command.
#[test]
fn test_handle_parse_command() {
    unsafe { std::env::set_var("CBAM_LOG_LEVEL", "off") };

    let dir = tempdir().unwrap();
    let file_path = dir.path().join("response.txt");
    fs::write(&file_path, RESPONSE).unwrap();

    handle_parse_command(&file_path, false, Some(Settings::default())).unwrap();
    handle_parse_command(&file_path, true, Some(Settings::default())).unwrap();

    // A missing file is an error
    assert!(
        handle_parse_command(
            &dir.path().join("missing.txt"),
            false,
            Some(Settings::default())
        )
        .is_err()
    );
}

#[test]
fn test_write_parsed_forecast_prices() {
    let mut out = Vec::new();
    let count = write_parsed_forecast(RESPONSE, false, &mut out).unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "period_label,value\nQ1 2025,90.0\nQ2 2025,91.5\n"
    );
}

#[test]
fn test_write_parsed_forecast_costs() {
    let mut out = Vec::new();
    let count = write_parsed_forecast(RESPONSE, true, &mut out).unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "period_label,reference_value,derived_cost\n\
         Q1 2025,90.0,186300.0\n\
         Q2 2025,91.5,189405.0\n"
    );
}

#[test]
fn test_write_parsed_forecast_no_rows() {
    let mut out = Vec::new();
    let count = write_parsed_forecast("No table here", false, &mut out).unwrap();
    assert_eq!(count, 0);
    assert!(out.is_empty());
}
