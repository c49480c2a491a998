//! Identity provider client
//!
//! The identity provider owns user accounts and issues the bearer tokens
//! callers present. It is treated as opaque: tokens are verified by asking
//! the provider who they belong to.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::ClientError;
use crate::{handle_empty_response, handle_response};

/// The authenticated caller behind a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Authentication and user-administration failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization required")]
    MissingCredential,

    #[error("Invalid authentication")]
    InvalidCredential,

    /// The provider refused an administrative request
    #[error("{0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<ClientError> for AuthError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ApiError { status, .. } if status == 401 || status == 403 => {
                AuthError::InvalidCredential
            }
            ClientError::ApiError { status, message } if (400..500).contains(&status) => {
                AuthError::Rejected(message)
            }
            other => AuthError::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token to the caller it was issued to
    async fn verify(&self, bearer: &str) -> Result<CallerIdentity, AuthError>;

    /// Creates a confirmed user account and returns its id
    async fn create_user(&self, email: &str, password: &str) -> Result<Uuid, AuthError>;

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn verify(&self, bearer: &str) -> Result<CallerIdentity, AuthError> {
        (**self).verify(bearer).await
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Uuid, AuthError> {
        (**self).create_user(email, password).await
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        (**self).delete_user(user_id).await
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// HTTP implementation of [`IdentityProvider`] for a Supabase-style auth API
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    config: Arc<IdentityConfig>,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(config: IdentityConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: IdentityConfig, client: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.config.url, path)
    }

    fn service_key(&self) -> Result<&str, AuthError> {
        self.config.service_key.as_deref().ok_or_else(|| {
            AuthError::Unavailable("IDENTITY_SERVICE_KEY is not configured".to_string())
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, bearer: &str) -> Result<CallerIdentity, AuthError> {
        if bearer.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let response = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(ClientError::from)?;

        let user: UserResponse = handle_response(response).await?;
        Ok(CallerIdentity {
            user_id: user.id,
            email: user.email,
        })
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Uuid, AuthError> {
        let key = self.service_key()?;
        let response = self
            .client
            .post(self.url("/admin/users"))
            .header("apikey", key)
            .bearer_auth(key)
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await
            .map_err(ClientError::from)?;

        let user: UserResponse = handle_response(response).await?;
        tracing::info!(user_id = %user.id, "Created user account");
        Ok(user.id)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        let key = self.service_key()?;
        let response = self
            .client
            .delete(self.url(&format!("/admin/users/{}", user_id)))
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .map_err(ClientError::from)?;

        handle_empty_response(response).await?;
        tracing::info!(%user_id, "Deleted user account");
        Ok(())
    }
}
