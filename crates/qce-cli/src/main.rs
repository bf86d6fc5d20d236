//! CLI entry point.

use clap::Parser;

use qce_cli::error::exit_code;
use qce_cli::{Cli, logging, run};

#[tokio::main]
async fn main() {
    // Load .env before parsing so clap's env fallbacks see it
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}
