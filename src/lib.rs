//! Common functionality for the CBAM exposure estimator.
#![warn(missing_docs)]
use anyhow::{Context, Result};
use std::path::PathBuf;

pub mod analysis;
pub mod calculator;
pub mod cli;
pub mod emissions;
pub mod ets;
pub mod forecast;
pub mod input;
pub mod llm;
pub mod log;
pub mod output;
pub mod product;
pub mod prompt;
pub mod report;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the path to the program's config directory (e.g. `~/.config/cbam` on Linux)
pub fn get_config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Could not find the user's config directory")?;
    path.push("cbam");
    Ok(path)
}
