//! Agent response normalization
//!
//! The agent answers in several shapes depending on which API is in use.
//! `AgentResponse::classify` picks the shape with a fixed precedence:
//!
//! 1. `choices[0].message.content` (chat completions)
//! 2. `output`
//! 3. `response`
//! 4. `content` (a string, or thread-message parts)
//! 5. the body itself when it is a JSON string
//!
//! Empty strings count as absent. Anything else is `Unrecognized`.

use serde_json::Value;

/// Returned when no shape matched
pub const NO_RESPONSE: &str = "No response received from agent";

/// Known upstream response shapes
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResponse {
    ChatCompletion(String),
    Output(String),
    Response(String),
    Content(String),
    Text(String),
    Unrecognized(Value),
}

impl AgentResponse {
    pub fn classify(body: &Value) -> Self {
        if let Some(text) = body
            .pointer("/choices/0/message/content")
            .and_then(non_empty_str)
        {
            return AgentResponse::ChatCompletion(text);
        }
        if let Some(text) = body.get("output").and_then(non_empty_str) {
            return AgentResponse::Output(text);
        }
        if let Some(text) = body.get("response").and_then(non_empty_str) {
            return AgentResponse::Response(text);
        }
        if let Some(text) = body.get("content").and_then(content_text) {
            return AgentResponse::Content(text);
        }
        if let Some(text) = non_empty_str(body) {
            return AgentResponse::Text(text);
        }
        AgentResponse::Unrecognized(body.clone())
    }

    /// The displayable text; never empty
    pub fn into_text(self) -> String {
        match self {
            AgentResponse::ChatCompletion(text)
            | AgentResponse::Output(text)
            | AgentResponse::Response(text)
            | AgentResponse::Content(text)
            | AgentResponse::Text(text) => text,
            AgentResponse::Unrecognized(_) => NO_RESPONSE.to_string(),
        }
    }
}

/// Extracts the answer text from any agent response body
pub fn extract_result(body: &Value) -> String {
    AgentResponse::classify(body).into_text()
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// `content` is either a plain string or a list of message parts
/// (`[{"type": "text", "text": {"value": ".."}}]` or `[{"value": ".."}]`).
fn content_text(content: &Value) -> Option<String> {
    if let Some(text) = non_empty_str(content) {
        return Some(text);
    }
    content.as_array()?.iter().find_map(|part| {
        part.pointer("/text/value")
            .and_then(non_empty_str)
            .or_else(|| part.get("text").and_then(non_empty_str))
            .or_else(|| part.get("value").and_then(non_empty_str))
    })
}
