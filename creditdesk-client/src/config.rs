//! Client configuration
//!
//! Connection settings for the external agent and the identity provider.
//! Both are read once at start-up and validated eagerly; a missing required
//! value is reported with the name of the environment variable.

use std::fmt;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Agent connection settings
///
/// Expected environment variables:
/// - AGENT_TENANT_ID (required)
/// - AGENT_CLIENT_ID (required)
/// - AGENT_CLIENT_SECRET (required)
/// - AGENT_ENDPOINT (required, e.g. https://xxx.services.ai.azure.com/api/projects/xxx)
/// - AGENT_ID (optional; enables the threads/runs API)
/// - AGENT_API_VERSION (optional, default: v1)
/// - AGENT_SCOPE (optional, default: https://cognitiveservices.azure.com/.default)
/// - AGENT_AUTHORITY_URL (optional, default: https://login.microsoftonline.com)
#[derive(Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: String,
    pub agent_id: Option<String>,
    pub api_version: String,
    pub scope: String,
    pub authority_url: String,
}

pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_SCOPE: &str = "https://cognitiveservices.azure.com/.default";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let config = Self {
            tenant_id: require("AGENT_TENANT_ID")?,
            client_id: require("AGENT_CLIENT_ID")?,
            client_secret: require("AGENT_CLIENT_SECRET")?,
            endpoint: require("AGENT_ENDPOINT")?
                .trim_end_matches('/')
                .to_string(),
            agent_id: get("AGENT_ID"),
            api_version: get("AGENT_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            scope: get("AGENT_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            authority_url: get("AGENT_AUTHORITY_URL")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("AGENT_TENANT_ID", &self.tenant_id),
            ("AGENT_CLIENT_ID", &self.client_id),
            ("AGENT_CLIENT_SECRET", &self.client_secret),
            ("AGENT_ENDPOINT", &self.endpoint),
            ("AGENT_API_VERSION", &self.api_version),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }
        require_http_url("AGENT_ENDPOINT", &self.endpoint)?;
        require_http_url("AGENT_AUTHORITY_URL", &self.authority_url)?;
        Ok(())
    }

    /// OAuth2 token endpoint for the client-credentials exchange
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url, self.tenant_id
        )
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("endpoint", &self.endpoint)
            .field("agent_id", &self.agent_id)
            .field("api_version", &self.api_version)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Identity provider settings
///
/// Expected environment variables:
/// - IDENTITY_URL (required)
/// - IDENTITY_ANON_KEY (required)
/// - IDENTITY_SERVICE_KEY (optional; needed for user administration)
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub url: String,
    pub anon_key: String,
    pub service_key: Option<String>,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = get("IDENTITY_URL")
            .ok_or(ConfigError::Missing("IDENTITY_URL"))?
            .trim_end_matches('/')
            .to_string();
        require_http_url("IDENTITY_URL", &url)?;

        Ok(Self {
            url,
            anon_key: get("IDENTITY_ANON_KEY").ok_or(ConfigError::Missing("IDENTITY_ANON_KEY"))?,
            service_key: get("IDENTITY_SERVICE_KEY"),
        })
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_ref().map(|_| "<set>"))
            .finish_non_exhaustive()
    }
}

fn require_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Invalid {
            field,
            reason: "must start with http:// or https://".to_string(),
        });
    }
    Ok(())
}
