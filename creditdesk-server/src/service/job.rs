//! Job Service
//!
//! Submission, lookup, awaiting and analytics of an organization's jobs.

use chrono::Utc;
use creditdesk_core::analytics::{self, JobAnalytics};
use creditdesk_core::domain::audit::AuditEntry;
use creditdesk_core::domain::job::Job;
use creditdesk_core::dto::job::{AnalyticsQuery, SubmitJob, SubmitOptions};
use creditdesk_dispatcher::{DispatchError, Submission};
use serde_json::json;
use uuid::Uuid;

use super::{Caller, ServiceError};
use crate::state::AppState;

/// Submit a job for the caller's organization
///
/// Without `wait` the job is polled in the background and returned right
/// after dispatch; with `wait` it is returned in its terminal state.
pub async fn submit_job(
    state: &AppState,
    caller: &Caller,
    req: SubmitJob,
    options: SubmitOptions,
) -> Result<Job, ServiceError> {
    caller.require_submit()?;
    caller.require_organization(req.organization_id)?;
    req.spec.validate().map_err(ServiceError::Validation)?;

    let context = state
        .directory
        .get_organization(caller.organization_id)
        .await?
        .map(|org| org.agent_config)
        .unwrap_or_else(|| json!({}));

    let details = json!({
        "template": req.spec.template,
        "instructions": req.spec.instructions,
    });

    let submission = Submission {
        organization_id: caller.organization_id,
        created_by: Some(caller.user_id),
        spec: req.spec,
        context,
    };

    let job = if options.wait {
        state.dispatcher.submit_and_wait(submission).await?
    } else {
        state.dispatcher.submit_and_track(submission).await?
    };

    let entry = AuditEntry::new(
        caller.organization_id,
        Some(caller.user_id),
        "trigger_analysis",
        "report",
        Some(job.id.to_string()),
        details,
    );
    if let Err(e) = state.directory.record_audit(&entry).await {
        tracing::warn!(job_id = %job.id, "Failed to record audit entry: {}", e);
    }

    tracing::info!(job_id = %job.id, status = %job.status, "Job submitted");
    Ok(job)
}

/// Get a job of the caller's organization
///
/// Jobs of other organizations are reported as missing.
pub async fn get_job(state: &AppState, caller: &Caller, id: Uuid) -> Result<Job, ServiceError> {
    let job = match state.dispatcher.get_job(id).await {
        Ok(job) => job,
        Err(DispatchError::NotFound(_)) => return Err(not_found(id)),
        Err(e) => return Err(e.into()),
    };

    if job.organization_id != caller.organization_id {
        return Err(not_found(id));
    }
    Ok(job)
}

/// List the caller's organization's jobs, newest first
pub async fn list_jobs(state: &AppState, caller: &Caller) -> Result<Vec<Job>, ServiceError> {
    Ok(state.dispatcher.list_jobs(caller.organization_id).await?)
}

/// Poll a job until it is terminal and return its final snapshot
pub async fn await_job(state: &AppState, caller: &Caller, id: Uuid) -> Result<Job, ServiceError> {
    let job = get_job(state, caller, id).await?;
    Ok(state.dispatcher.await_completion(job.id).await?)
}

pub async fn job_analytics(
    state: &AppState,
    caller: &Caller,
    query: &AnalyticsQuery,
) -> Result<JobAnalytics, ServiceError> {
    let jobs = list_jobs(state, caller).await?;
    Ok(analytics::summarize(&jobs, Utc::now(), query.window()))
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Job {}", id))
}
