//! CreditDesk HTTP clients
//!
//! Typed clients for the two external collaborators of the CreditDesk
//! backend: the compute agent that generates reports and answers chat
//! messages, and the identity provider that owns user accounts.
//!
//! Both are exposed behind traits (`AgentClient`, `IdentityProvider`) so the
//! dispatcher and the server can be exercised against the scripted doubles in
//! [`mock`] (enable the `test-util` feature).
//!
//! # Example
//!
//! ```no_run
//! use creditdesk_client::{AgentClient, AgentConfig, AgentRequest, HttpAgentClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agent = HttpAgentClient::new(AgentConfig::from_env()?);
//!
//!     let request = AgentRequest::for_chat(&[], "Summarize our largest exposures");
//!     let external_ref = agent.enqueue(&request).await?;
//!     println!("Dispatched as {}", external_ref);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod identity;
#[cfg(feature = "test-util")]
pub mod mock;
pub mod token;

// Re-export commonly used types
pub use agent::{AgentClient, AgentRequest, HttpAgentClient, RemoteState, RemoteStatus};
pub use config::{AgentConfig, ConfigError, IdentityConfig};
pub use error::{ClientError, Result};
pub use identity::{AuthError, CallerIdentity, HttpIdentityProvider, IdentityProvider};
pub use token::ClientCredentials;

#[cfg(feature = "test-util")]
pub use mock::{ScriptedAgent, StaticIdentityProvider, Step};

use serde::de::DeserializeOwned;

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code and deserialize the JSON body
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Check the status code of a response without a body (e.g., DELETE operations)
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}
