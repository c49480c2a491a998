//! Bearer authentication
//!
//! Resolves the `Authorization: Bearer <token>` header to a [`Caller`]: the
//! identity provider vouches for the token, the directory supplies the
//! caller's organization and role.

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};

use crate::api::error::ApiError;
use crate::service::Caller;
use crate::state::AppState;

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Authorization required".to_string()))?;

        let identity = state.identity.verify(token).await?;

        let membership = state
            .directory
            .role_for_user(identity.user_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!(user_id = %identity.user_id, "Caller has no organization role");
                ApiError::Forbidden("User not assigned to an organization".to_string())
            })?;

        Ok(Caller {
            user_id: identity.user_id,
            email: identity.email,
            organization_id: membership.organization_id,
            role: membership.role,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
