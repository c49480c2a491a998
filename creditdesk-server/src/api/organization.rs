//! Organization API Handlers

use axum::{Json, extract::State};
use creditdesk_core::dto::organization::{RegisterOrganization, RegistrationReceipt};

use crate::api::error::ApiResult;
use crate::service::organization_service;
use crate::state::AppState;

/// POST /organizations/register
/// Register an organization and its admin; no authentication
pub async fn register_organization(
    State(state): State<AppState>,
    Json(req): Json<RegisterOrganization>,
) -> ApiResult<Json<RegistrationReceipt>> {
    tracing::info!("Registering organization: {}", req.organization_name);

    let receipt = organization_service::register(&state, req).await?;
    Ok(Json(receipt))
}
