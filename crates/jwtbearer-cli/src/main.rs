mod cli;
mod commands;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    match &cli.command {
        Commands::Inspect(args) => commands::inspect::inspect(args)?,
        Commands::CheckConfig(args) => commands::check_config::check_config(args)?,
        Commands::Exchange(args) => commands::exchange::exchange(args).await?,
    }

    Ok(())
}
