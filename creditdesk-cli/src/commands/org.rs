//! Organization command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use creditdesk_core::dto::organization::RegisterOrganization;

use crate::api::ApiClient;
use crate::config::Config;

#[derive(Subcommand)]
pub enum OrgCommands {
    /// Register a new organization with its admin user
    Register {
        /// Organization name
        #[arg(long)]
        name: String,

        /// Organization contact e-mail; its domain becomes the organization domain
        #[arg(long)]
        email: String,

        /// E-mail of the admin user to create
        #[arg(long)]
        admin_email: String,

        /// Password of the admin user
        #[arg(long, env = "CREDITDESK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

pub async fn handle_org_command(command: OrgCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url, config.token.clone());

    match command {
        OrgCommands::Register {
            name,
            email,
            admin_email,
            password,
        } => {
            let receipt = client
                .register_organization(&RegisterOrganization {
                    organization_name: name,
                    organization_email: email,
                    admin_email,
                    password,
                })
                .await?;

            println!("{}", "✓ Organization registered".green().bold());
            println!("  Organization: {}", receipt.organization_id.to_string().cyan());
            println!("  Admin user:   {}", receipt.user_id.to_string().dimmed());
            Ok(())
        }
    }
}
