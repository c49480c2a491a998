//! Chat Service

use creditdesk_core::dto::chat::{ChatReply, ChatRequest};

use super::{Caller, ServiceError};
use crate::state::AppState;

/// Forward a chat message to the agent on behalf of the caller
pub async fn chat(
    state: &AppState,
    caller: &Caller,
    req: &ChatRequest,
) -> Result<ChatReply, ServiceError> {
    caller.require_organization(req.organization_id)?;
    let cancel = state.shutdown.child_token();
    Ok(state.chat.reply(req, &cancel).await?)
}
