//! Chat API Handler

use axum::{Json, extract::State};
use creditdesk_core::dto::chat::{ChatReply, ChatRequest};

use crate::api::error::ApiResult;
use crate::service::{Caller, chat_service};
use crate::state::AppState;

/// POST /chat
/// Agent failures still answer 200 with an apology and an `error` field
pub async fn chat(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    tracing::debug!(
        user_id = %caller.user_id,
        history = req.conversation_history.len(),
        "Chat message received"
    );

    let reply = chat_service::chat(&state, &caller, &req).await?;
    Ok(Json(reply))
}
