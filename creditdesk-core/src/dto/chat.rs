//! Chat DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::chat::ChatMessage;

/// A chat message sent to the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

/// Reply from the agent
///
/// Always carries a displayable `response`. `error` is set when the agent
/// could not be reached or failed, in which case `response` is an apology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub const APOLOGY: &'static str = "I apologize, but I encountered an error processing your request. Please try again.";

    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            response: Self::APOLOGY.to_string(),
            error: Some(error.into()),
        }
    }
}
