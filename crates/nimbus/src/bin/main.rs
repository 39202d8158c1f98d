//! NIMBUS CLI binary entry point.
//!
//! This binary requires the `cli` feature to be enabled.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nimbus", version, about = "NIMBUS weather-risk sensor agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(nimbus::cli::run::Args),
    Config(nimbus::cli::config::Args),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => nimbus::cli::run::execute(args).await,
        Commands::Config(args) => nimbus::cli::config::execute(args),
    }
}
