//! Job API Handlers
//!
//! HTTP endpoints for report jobs.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use creditdesk_core::analytics::JobAnalytics;
use creditdesk_core::domain::job::Job;
use creditdesk_core::dto::job::{AnalyticsQuery, SubmitJob, SubmitOptions};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::{Caller, job_service};
use crate::state::AppState;

/// POST /jobs
/// Submit a job; `?wait=true` answers with the job in its terminal state
pub async fn submit_job(
    State(state): State<AppState>,
    caller: Caller,
    Query(options): Query<SubmitOptions>,
    Json(req): Json<SubmitJob>,
) -> ApiResult<Json<Job>> {
    tracing::info!(
        organization_id = %caller.organization_id,
        "Submitting job '{}' (template: {})",
        req.spec.name,
        req.spec.template
    );

    let job = job_service::submit_job(&state, &caller, req, options).await?;
    Ok(Json(job))
}

/// GET /jobs
/// List the caller's organization's jobs
pub async fn list_jobs(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing jobs for organization: {}", caller.organization_id);

    let jobs = job_service::list_jobs(&state, &caller).await?;
    Ok(Json(jobs))
}

/// GET /jobs/analytics
pub async fn job_analytics(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<JobAnalytics>> {
    let analytics = job_service::job_analytics(&state, &caller, &query).await?;
    Ok(Json(analytics))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(&state, &caller, id).await?;
    Ok(Json(job))
}

/// POST /jobs/{id}/await
/// Poll a processing job until it is terminal
pub async fn await_job(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::info!("Awaiting job: {}", id);

    let job = job_service::await_job(&state, &caller, id).await?;
    Ok(Json(job))
}
