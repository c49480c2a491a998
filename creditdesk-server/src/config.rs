//! Server configuration

use creditdesk_client::{AgentConfig, ConfigError, IdentityConfig};
use creditdesk_dispatcher::PollConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Everything the server reads from its environment
///
/// Expected environment variables, besides the AGENT_*, IDENTITY_* and
/// POLL_* groups read by the respective configs:
/// - CREDITDESK_BIND_ADDR (optional, default: 0.0.0.0:8080)
/// - DATABASE_URL (optional; in-memory stores when absent)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub agent: AgentConfig,
    pub identity: IdentityConfig,
    pub poll: PollConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_addr: get("CREDITDESK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: get("DATABASE_URL"),
            agent: AgentConfig::from_lookup(&lookup)?,
            identity: IdentityConfig::from_lookup(&lookup)?,
            poll: PollConfig::from_lookup(&lookup)?,
        })
    }
}
