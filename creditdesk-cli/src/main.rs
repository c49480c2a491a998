//! CreditDesk CLI
//!
//! Command-line interface for the CreditDesk server.

mod api;
mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "creditdesk")]
#[command(about = "CreditDesk credit analysis CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(
        long,
        env = "CREDITDESK_SERVER_URL",
        default_value = "http://localhost:8080"
    )]
    server_url: String,

    /// Bearer token issued by the identity provider
    #[arg(long, env = "CREDITDESK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
        token: cli.token,
    };

    handle_command(cli.command, &config).await
}
