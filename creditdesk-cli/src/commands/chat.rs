//! Chat command handler

use anyhow::Result;
use colored::*;
use creditdesk_core::dto::chat::ChatRequest;

use crate::api::ApiClient;
use crate::config::Config;

pub async fn handle_chat(message: String, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url, config.token.clone());

    let reply = client
        .chat(&ChatRequest {
            message,
            organization_id: None,
            conversation_history: Vec::new(),
        })
        .await?;

    match reply.error {
        Some(error) => {
            println!("{}", reply.response.yellow());
            println!("{} {}", "Error:".red().bold(), error.dimmed());
        }
        None => println!("{}", reply.response),
    }

    Ok(())
}
