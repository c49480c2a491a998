//! Schedule API Handlers

use axum::{Json, extract::State, http::StatusCode};
use creditdesk_core::domain::schedule::Schedule;
use creditdesk_core::dto::schedule::CreateSchedule;

use crate::api::error::ApiResult;
use crate::service::{Caller, schedule_service};
use crate::state::AppState;

/// POST /schedules
pub async fn create_schedule(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateSchedule>,
) -> ApiResult<(StatusCode, Json<Schedule>)> {
    tracing::info!("Creating schedule: {}", req.name);

    let schedule = schedule_service::create_schedule(&state, &caller, req).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// GET /schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Schedule>>> {
    let schedules = schedule_service::list_schedules(&state, &caller).await?;
    Ok(Json(schedules))
}
