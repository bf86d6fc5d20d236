//! `qce`: command-line front end for the NapCat-QCE export service.

#![deny(unused_crate_dependencies)]

// Loaded in main before argument parsing
use dotenvy as _;

pub mod commands;
pub mod context;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod parser;
pub mod presentation;

pub use commands::{Commands, ExportArgs, ExportTarget, LaunchArgs, TaskCommand};
pub use context::CliContext;
pub use parser::Cli;

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = CliContext::from_cli(&cli);
    match &cli.command {
        Commands::Launch(args) => handlers::launch::execute(&ctx, args).await,
        Commands::Export { target } => handlers::export::execute(&ctx, target).await,
        Commands::Tasks { command } => handlers::tasks::execute(&ctx, command).await,
        Commands::Monitor { task, timeout } => {
            handlers::monitor::execute(&ctx, task.as_deref(), *timeout).await
        }
        Commands::Status => handlers::status::execute(&ctx).await,
    }
}
