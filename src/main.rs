//! Provides the main entry point to the program.
use human_panic::{metadata, setup_panic};

fn main() {
    setup_panic!(metadata!().support("Open an issue on GitHub with the report file attached."));

    // Variables such as the API key may be kept in a .env file
    dotenv::dotenv().ok();

    if let Err(err) = cbam::cli::run_cli() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
