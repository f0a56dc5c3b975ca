//! Drover CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use drover::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Batch(command) => drover::cli::commands::batch::execute(command, cli.json).await,
        Commands::Governance(command) => {
            drover::cli::commands::governance::execute(command, cli.json).await
        }
        Commands::Gate(command) => drover::cli::commands::gate::execute(command, cli.json).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => drover::cli::handle_error(&err, cli.json),
    };
    std::process::exit(code);
}
