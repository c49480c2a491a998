//! Organization Service
//!
//! Registration of a new organization with its first admin. The steps span
//! the directory store and the identity provider, so earlier steps are
//! undone by hand when a later one fails.

use creditdesk_client::AuthError;
use creditdesk_core::domain::organization::{AppRole, Organization, Profile, UserRole};
use creditdesk_core::dto::organization::{RegisterOrganization, RegistrationReceipt};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::DirectoryError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{0}")]
    Invalid(String),

    #[error("Failed to create organization: {0}")]
    Organization(DirectoryError),

    #[error("Failed to create user: {0}")]
    User(AuthError),

    #[error("Failed to assign role: {0}")]
    Role(DirectoryError),
}

/// Register an organization and its admin user
///
/// Steps, in order: organization, user account, admin role, profile. A
/// failure to create the user deletes the organization; a failure to assign
/// the role deletes the user and the organization. A missing profile is
/// only logged.
pub async fn register(
    state: &AppState,
    req: RegisterOrganization,
) -> Result<RegistrationReceipt, RegistrationError> {
    req.validate().map_err(RegistrationError::Invalid)?;

    let organization = Organization::new(req.organization_name.trim(), &req.organization_email);
    state
        .directory
        .create_organization(&organization)
        .await
        .map_err(|e| {
            tracing::error!("Error creating organization: {}", e);
            RegistrationError::Organization(e)
        })?;

    let user_id = match state
        .identity
        .create_user(req.admin_email.trim(), &req.password)
        .await
    {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::error!(organization_id = %organization.id, "Error creating user: {}", e);
            rollback_organization(state, organization.id).await;
            return Err(RegistrationError::User(e));
        }
    };

    let role = UserRole {
        user_id,
        organization_id: organization.id,
        role: AppRole::Admin,
    };
    if let Err(e) = state.directory.insert_role(&role).await {
        tracing::error!(organization_id = %organization.id, %user_id, "Error assigning role: {}", e);
        if let Err(e) = state.identity.delete_user(user_id).await {
            tracing::error!(%user_id, "Rollback failed to delete user: {}", e);
        }
        rollback_organization(state, organization.id).await;
        return Err(RegistrationError::Role(e));
    }

    let profile = Profile {
        user_id,
        organization_id: organization.id,
        email: req.admin_email.trim().to_string(),
    };
    if let Err(e) = state.directory.insert_profile(&profile).await {
        tracing::warn!(%user_id, "Error creating profile: {}", e);
    }

    tracing::info!(organization_id = %organization.id, %user_id, "Organization registered");

    Ok(RegistrationReceipt {
        success: true,
        organization_id: organization.id,
        user_id,
    })
}

async fn rollback_organization(state: &AppState, organization_id: Uuid) {
    if let Err(e) = state.directory.delete_organization(organization_id).await {
        tracing::error!(%organization_id, "Rollback failed to delete organization: {}", e);
    }
}
