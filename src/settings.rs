//! Program settings, read from `settings.toml` in the user's config directory.
use crate::get_config_dir;
use crate::input::{input_err_msg, read_toml};
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{Context, Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for the CBAM exposure estimator.
# Uncomment a line to change a setting from its default value.
";

macro_rules! define_setting_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_setting_default!(default_log_level, String, DEFAULT_LOG_LEVEL.to_string());
define_setting_default!(
    default_forecast_model,
    String,
    "gemini-2.0-flash".to_string()
);
define_setting_default!(default_report_model, String, "gemini-1.5-flash".to_string());
define_setting_default!(
    default_api_base_url,
    String,
    "https://generativelanguage.googleapis.com/v1beta".to_string()
);
define_setting_default!(default_max_retries, u32, 3);
define_setting_default!(default_history_limit, usize, 200);

/// Check that the `history_limit` setting is valid
fn check_history_limit(value: usize) -> Result<()> {
    ensure!(value > 0, "history_limit cannot be zero");

    Ok(())
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SETTINGS_FILE_NAME))
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output directories by default
    #[serde(default)]
    pub overwrite: bool,
    /// The model used to forecast carbon prices and costs
    #[serde(default = "default_forecast_model")]
    pub forecast_model: String,
    /// The model used to write executive reports
    #[serde(default = "default_report_model")]
    pub report_model: String,
    /// Base URL of the Gemini API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Maximum number of attempts for a model request which is rate limited
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Maximum number of historical carbon price observations to use
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            forecast_model: default_forecast_model(),
            report_model: default_report_model(),
            api_base_url: default_api_base_url(),
            max_retries: default_max_retries(),
            history_limit: default_history_limit(),
        }
    }
}

impl Settings {
    /// Read the settings file from the user's config directory.
    ///
    /// If the file is not present, default values are used.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path()?)
    }

    /// Read settings from the specified path, falling back to defaults if there is no file
    pub fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(settings)
    }

    /// Check that settings values are usable
    pub fn validate(&self) -> Result<()> {
        // history_limit
        check_history_limit(self.history_limit)?;

        Ok(())
    }

    /// The contents of the default settings file, with every setting commented out and documented
    pub fn default_file_contents() -> String {
        let settings_raw =
            toml::to_string(&Settings::default()).expect("Could not convert settings to TOML");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            let Some(eq) = line.find('=') else {
                continue;
            };

            // All fields should have doc comments
            let field = line[..eq].trim();
            let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
            for doc_line in docs.lines() {
                write!(&mut out, "\n# # {}\n", doc_line.trim()).unwrap();
            }
            writeln!(&mut out, "# {}", line.trim()).unwrap();
        }

        out
    }
}
