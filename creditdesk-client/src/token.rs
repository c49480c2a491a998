//! OAuth2 client-credentials token exchange
//!
//! The agent API only accepts bearer tokens minted by the tenant's authority.
//! Tokens are cached and reused until shortly before they expire.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::AgentConfig;
use crate::error::{ClientError, Result};

/// Tokens are refreshed this long before their advertised expiry
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on how long a token is reused, whatever the authority says
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Client-credentials grant with a single cached token
#[derive(Debug)]
pub struct ClientCredentials {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentials {
    pub fn new(config: &AgentConfig, http: reqwest::Client) -> Self {
        Self {
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            http,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid access token, exchanging credentials if needed
    ///
    /// Concurrent callers wait on the same exchange instead of each
    /// requesting their own token.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        let token = self.exchange().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drops the cached token, e.g. after the agent answered 401
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self) -> Result<CachedToken> {
        tracing::debug!(url = %self.token_url, "Requesting agent access token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self.http.post(&self.token_url).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Token exchange failed: {}", body);
            return Err(ClientError::Unauthorized(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Invalid token response: {}", e)))?;

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: refresh_deadline(Instant::now(), token.expires_in),
        })
    }
}

fn refresh_deadline(now: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in)
        .min(MAX_TOKEN_LIFETIME)
        .saturating_sub(EXPIRY_MARGIN);
    now.checked_add(lifetime).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_deadline_keeps_margin() {
        let now = Instant::now();
        assert_eq!(refresh_deadline(now, 3600), now + Duration::from_secs(3540));
        assert_eq!(refresh_deadline(now, 30), now);
    }

    #[test]
    fn test_refresh_deadline_caps_huge_lifetimes() {
        let now = Instant::now();
        assert_eq!(
            refresh_deadline(now, u64::MAX),
            now + MAX_TOKEN_LIFETIME - EXPIRY_MARGIN
        );
    }
}
