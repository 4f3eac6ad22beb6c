use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jwtbearer")]
#[command(about = "Inspect and exchange RFC 7523 JWT bearer assertions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, env = "JWTBEARER_LOG", default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the header and claims of an assertion without verifying it
    Inspect(InspectArgs),
    /// Validate a grant configuration file
    CheckConfig(CheckConfigArgs),
    /// Run a token request for an assertion against a local key registry
    Exchange(ExchangeArgs),
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// The assertion, or @path to read it from a file
    pub assertion: String,
}

#[derive(clap::Args)]
pub struct CheckConfigArgs {
    /// Path to the TOML configuration
    pub file: PathBuf,
}

#[derive(clap::Args)]
pub struct ExchangeArgs {
    /// Path to the TOML grant configuration
    #[arg(short, long)]
    pub config: PathBuf,
    /// Path to the JSON key registry
    #[arg(short, long)]
    pub keys: PathBuf,
    /// The assertion, or @path to read it from a file
    #[arg(short, long)]
    pub assertion: String,
    /// Requested scope (repeatable)
    #[arg(short, long = "scope")]
    pub scopes: Vec<String>,
    /// Requested audience (repeatable)
    #[arg(long = "audience")]
    pub audiences: Vec<String>,
    /// Client the request is made by
    #[arg(long, default_value = "jwtbearer-cli")]
    pub client_id: String,
    /// `iss` of the issued access token
    #[arg(long, default_value = "jwtbearer")]
    pub token_issuer: String,
    /// HS256 secret used to sign the issued access token
    #[arg(long, env = "JWTBEARER_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: String,
}
