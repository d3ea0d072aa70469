//! The command line interface for the CBAM exposure estimator.
use crate::analysis::{AnalysisRequest, run_full_analysis};
use crate::calculator::{CostCalculationInput, CostSummary, get_summary_with_foreign_price};
use crate::forecast::{parse_cost_forecast_table, parse_forecast_table};
use crate::input::input_err_msg;
use crate::llm::{GeminiClient, TextGenerator};
use crate::log;
use crate::output::{create_output_directory, get_output_dir, write_analysis};
use crate::product::ProductTable;
use crate::settings::Settings;
use crate::units::{EmissionIntensity, MoneyPerEmissions, Tonnes};
use ::log::{info, warn};
use anyhow::{Context, Result, bail, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod products;
use products::ProductSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the CBAM exposure estimator.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for choosing the emission reference table
#[derive(Args, Default)]
pub struct TableOpts {
    /// CSV file of emission intensities to use instead of the built-in table
    #[arg(long)]
    pub table: Option<PathBuf>,
}

impl TableOpts {
    /// Load the chosen table
    pub fn load(&self) -> Result<Cow<'static, ProductTable>> {
        Ok(match &self.table {
            Some(file_path) => Cow::Owned(ProductTable::from_csv(file_path)?),
            None => Cow::Borrowed(ProductTable::builtin()),
        })
    }
}

/// Options for the calculate command
#[derive(Args)]
pub struct CalculateOpts {
    /// Quantity imported, in tonnes
    #[arg(short, long)]
    pub quantity: f64,
    /// Current EU ETS price (EUR/tCO2e)
    #[arg(short, long)]
    pub price: f64,
    /// Carbon price already paid in the country of origin (EUR/tCO2e)
    #[arg(long, default_value_t = 0.0)]
    pub foreign_price: f64,
    /// Emission reference table
    #[command(flatten)]
    pub table: TableOpts,
}

/// Options for the analyse command
#[derive(Args)]
pub struct AnalyseOpts {
    /// Quantity imported, in tonnes
    #[arg(short, long)]
    pub quantity: f64,
    /// Current EU ETS price (EUR/tCO2e)
    #[arg(short, long)]
    pub price: f64,
    /// Carbon price already paid in the country of origin (EUR/tCO2e)
    #[arg(long, default_value_t = 0.0)]
    pub foreign_price: f64,
    /// CSV file of historical EU ETS prices
    #[arg(long)]
    pub history: PathBuf,
    /// TOML file of installation activity data for a Scope 1/2 analysis
    #[arg(long)]
    pub emissions: Option<PathBuf>,
    /// Emission reference table
    #[command(flatten)]
    pub table: TableOpts,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Calculate the current CBAM cost of an import.
    Calculate {
        /// CN code of the imported product.
        product_code: String,
        /// Other calculation options
        #[command(flatten)]
        opts: CalculateOpts,
    },
    /// Look up products in the emission reference table.
    Products {
        /// The available subcommands for looking up products.
        #[command(subcommand)]
        subcommand: ProductSubcommands,
    },
    /// Read a forecast table from a saved model response.
    Parse {
        /// File containing the model response.
        file: PathBuf,
        /// Read a three-column cost forecast instead of a price forecast
        #[arg(long)]
        cost: bool,
    },
    /// Forecast CBAM costs for an import and write an executive report.
    Analyse {
        /// CN code of the imported product.
        product_code: String,
        /// Other analysis options
        #[command(flatten)]
        opts: AnalyseOpts,
    },
    /// Manage example input files.
    Example {
        /// The available subcommands for managing examples.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Calculate { product_code, opts } => {
                handle_calculate_command(&product_code, &opts, None)
            }
            Self::Products { subcommand } => subcommand.execute(),
            Self::Parse { file, cost } => handle_parse_command(&file, cost, None),
            Self::Analyse { product_code, opts } => {
                handle_analyse_command(&product_code, &opts, None, None)
            }
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ cbam --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Initialise the program logger, unless this has already been done
fn init_logger(settings: &Settings, log_file_dir: Option<&Path>) -> Result<()> {
    if !log::is_logger_initialised() {
        log::init(Some(settings.log_level.as_str()), log_file_dir)
            .context("Failed to initialise logging.")?;
    }

    Ok(())
}

/// Check the quantity and prices given by the user
fn validate_user_input(quantity: f64, price: f64, foreign_price: f64) -> Result<()> {
    CostCalculationInput::new(
        MoneyPerEmissions(price),
        Tonnes(quantity),
        EmissionIntensity(0.0),
        EmissionIntensity(0.0),
    )
    .with_foreign_carbon_price(MoneyPerEmissions(foreign_price))
    .validate()
}

/// Print a cost summary to the console
fn print_summary(summary: &CostSummary) {
    let result = &summary.result;
    println!(
        "Product:               {} ({})",
        summary.product, summary.product_code
    );
    println!("Category:              {}", summary.category);
    println!("Quantity:              {:.2} t", summary.quantity.value());
    println!(
        "Emission intensity:    {:.3} direct + {:.3} indirect = {:.3} tCO2e/t",
        summary.direct_intensity.value(),
        summary.indirect_intensity.value(),
        result.total_intensity.value()
    );
    println!(
        "Embedded emissions:    {:.2} tCO2e",
        result.total_emission.value()
    );
    println!("Certificates required: {:.2}", result.certificates_required);
    println!(
        "EU ETS price:          {:.2} EUR/tCO2e",
        summary.reference_carbon_price.value()
    );
    println!(
        "Gross CBAM cost:       {:.2} EUR",
        result.gross_cost.value()
    );
    println!(
        "Adjusted CBAM cost:    {:.2} EUR",
        result.adjusted_cost.value()
    );
}

/// Handle the `calculate` command.
pub fn handle_calculate_command(
    product_code: &str,
    opts: &CalculateOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logger(&settings, None)?;

    validate_user_input(opts.quantity, opts.price, opts.foreign_price)?;
    let table = opts.table.load()?;
    let Some(summary) = get_summary_with_foreign_price(
        &table,
        product_code,
        Tonnes(opts.quantity),
        MoneyPerEmissions(opts.price),
        MoneyPerEmissions(opts.foreign_price),
    ) else {
        bail!("Product code {} not found", product_code.trim());
    };

    print_summary(&summary);

    Ok(())
}

/// Read forecast rows from a model response and write them to `out` as CSV.
///
/// Returns the number of rows written.
///
/// # Arguments
///
/// * `raw_text` - The model response
/// * `cost` - Whether to read a three-column cost forecast instead of a price forecast
/// * `out` - Where to write the rows
pub fn write_parsed_forecast<W: Write>(raw_text: &str, cost: bool, out: W) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    let count = if cost {
        let table = parse_cost_forecast_table(raw_text);
        for point in &table {
            writer.serialize(point)?;
        }
        table.len()
    } else {
        let table = parse_forecast_table(raw_text);
        for point in &table {
            writer.serialize(point)?;
        }
        table.len()
    };
    writer.flush()?;

    Ok(count)
}

/// Handle the `parse` command.
///
/// The rows read are written to stdout as CSV.
pub fn handle_parse_command(
    file_path: &Path,
    cost: bool,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logger(&settings, None)?;

    let raw_text = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let count = write_parsed_forecast(&raw_text, cost, io::stdout())?;

    // Only warn, as info messages would be mixed in with the CSV output
    if count == 0 {
        warn!("No forecast rows found in {}", file_path.display());
    }

    Ok(())
}

/// Handle the `analyse` command.
///
/// # Arguments
///
/// * `product_code` - CN code of the imported product
/// * `opts` - Analysis options
/// * `generator` - Model to use. If `None`, the Gemini API is used.
/// * `settings` - Program settings. If `None`, these are loaded from the settings file.
pub fn handle_analyse_command(
    product_code: &str,
    opts: &AnalyseOpts,
    generator: Option<&dyn TextGenerator>,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    validate_user_input(opts.quantity, opts.price, opts.foreign_price)?;
    let table = opts.table.load()?;
    ensure!(
        table.lookup(product_code).is_some(),
        "Product code {} not found",
        product_code.trim()
    );

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(product_code);
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    init_logger(&settings, Some(output_path))?;
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let client: GeminiClient;
    let generator: &dyn TextGenerator = if let Some(generator) = generator {
        generator
    } else {
        client = GeminiClient::from_settings(&settings)?;
        &client
    };

    let request = AnalysisRequest {
        product_code: product_code.trim().to_string(),
        quantity: Tonnes(opts.quantity),
        carbon_price: MoneyPerEmissions(opts.price),
        foreign_carbon_price: MoneyPerEmissions(opts.foreign_price),
        history_path: opts.history.clone(),
        emissions_path: opts.emissions.clone(),
    };
    let Some(result) = run_full_analysis(&request, &table, generator, &settings)? else {
        bail!("Product code {} not found", request.product_code);
    };

    write_analysis(output_path, &result)?;
    print_summary(&result.summary);
    println!("\n{}", result.report.text);
    info!("Analysis complete!");

    Ok(())
}
