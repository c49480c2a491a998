//! Chat with the agent
//!
//! Uses the threads/runs API when the agent supports it and falls back to a
//! single chat-completions call otherwise. Agent failures never escape: they
//! become an apology reply carrying the error.

use creditdesk_client::{AgentClient, AgentRequest};
use creditdesk_core::domain::chat::ChatMessage;
use creditdesk_core::dto::chat::{ChatReply, ChatRequest};
use creditdesk_core::extract::AgentResponse;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PollConfig;
use crate::error::DispatchError;
use crate::scheduler::{PollOutcome, poll_until_terminal};

#[derive(Clone)]
pub struct ChatService {
    agent: Arc<dyn AgentClient>,
    config: PollConfig,
}

impl ChatService {
    pub fn new(agent: Arc<dyn AgentClient>, config: PollConfig) -> Self {
        Self { agent, config }
    }

    /// Answers one chat message; only an empty message is an error
    pub async fn reply(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, DispatchError> {
        if request.message.trim().is_empty() {
            return Err(DispatchError::InvalidSpec("Message is required".to_string()));
        }

        let reply = if self.agent.supports_runs() {
            self.reply_with_run(request, cancel).await
        } else {
            self.reply_with_completion(request).await
        };

        if let Some(error) = &reply.error {
            warn!("Chat failed: {}", error);
        }
        Ok(reply)
    }

    async fn reply_with_run(&self, request: &ChatRequest, cancel: &CancellationToken) -> ChatReply {
        let agent_request = AgentRequest::for_chat(&request.conversation_history, &request.message);
        let external_ref = match self.agent.enqueue(&agent_request).await {
            Ok(external_ref) => external_ref,
            Err(e) => return ChatReply::failed(format!("Agent request failed: {}", e)),
        };
        info!(run = %external_ref, "Chat run created");

        match poll_until_terminal(self.agent.as_ref(), &external_ref, &self.config, cancel).await {
            PollOutcome::Succeeded(result) => ChatReply::ok(answer_text(&result)),
            PollOutcome::Failed(message) => ChatReply::failed(message),
            PollOutcome::Cancelled => ChatReply::failed("chat cancelled"),
        }
    }

    async fn reply_with_completion(&self, request: &ChatRequest) -> ChatReply {
        let mut messages: Vec<ChatMessage> = request.conversation_history.clone();
        messages.push(ChatMessage::user(request.message.clone()));

        match self.agent.complete(&messages).await {
            Ok(body) => ChatReply::ok(answer_text(&body)),
            Err(e) => ChatReply::failed(format!("Agent request failed: {}", e)),
        }
    }
}

/// Structured answers without a known text field are shown as JSON
fn answer_text(body: &Value) -> String {
    match AgentResponse::classify(body) {
        AgentResponse::Unrecognized(Value::Object(map)) if !map.is_empty() => {
            Value::Object(map).to_string()
        }
        response => response.into_text(),
    }
}
