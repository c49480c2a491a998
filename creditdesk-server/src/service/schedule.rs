//! Schedule Service

use chrono::Utc;
use creditdesk_core::domain::audit::AuditEntry;
use creditdesk_core::domain::schedule::Schedule;
use creditdesk_core::dto::schedule::CreateSchedule;
use serde_json::json;
use uuid::Uuid;

use super::{Caller, ServiceError};
use crate::state::AppState;

/// Create a schedule for the caller's organization
pub async fn create_schedule(
    state: &AppState,
    caller: &Caller,
    req: CreateSchedule,
) -> Result<Schedule, ServiceError> {
    caller.require_submit()?;

    let now = Utc::now();
    req.validate(now).map_err(ServiceError::Validation)?;

    let schedule = Schedule {
        id: Uuid::new_v4(),
        organization_id: caller.organization_id,
        created_by: Some(caller.user_id),
        name: req.name,
        template: req.template,
        instructions: req.instructions,
        data_sources: req.data_sources,
        recurrence: req.recurrence,
        next_run_at: req.next_run_at,
        timezone: req.timezone,
        output_formats: req.output_formats,
        recipients: req.recipients,
        is_active: true,
        created_at: now,
    };
    state.directory.create_schedule(&schedule).await?;

    let entry = AuditEntry::new(
        caller.organization_id,
        Some(caller.user_id),
        "create_schedule",
        "schedule",
        Some(schedule.id.to_string()),
        json!({
            "name": schedule.name,
            "recurrence": schedule.recurrence,
        }),
    );
    if let Err(e) = state.directory.record_audit(&entry).await {
        tracing::warn!(schedule_id = %schedule.id, "Failed to record audit entry: {}", e);
    }

    tracing::info!(schedule_id = %schedule.id, "Schedule created");
    Ok(schedule)
}

/// List the caller's organization's schedules
pub async fn list_schedules(state: &AppState, caller: &Caller) -> Result<Vec<Schedule>, ServiceError> {
    Ok(state.directory.list_schedules(caller.organization_id).await?)
}
