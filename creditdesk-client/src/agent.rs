//! External compute agent client
//!
//! The agent runs report generation and chat asynchronously: a request is
//! enqueued as a thread + run, and the run is polled until it reaches a
//! terminal state. When no agent id is configured only the synchronous
//! chat-completions endpoint is available.

use async_trait::async_trait;
use creditdesk_core::domain::chat::ChatMessage;
use creditdesk_core::domain::job::{ExternalRef, Job, JobSpec};
use creditdesk_core::extract::{NO_RESPONSE, extract_result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::error::{ClientError, Result};
use crate::handle_response;
use crate::token::ClientCredentials;

const MAX_COMPLETION_TOKENS: u32 = 2000;

/// Work handed to the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRequest {
    pub messages: Vec<ChatMessage>,
    /// Organization-specific settings, passed along as run instructions
    pub context: Option<Value>,
}

impl AgentRequest {
    /// The report prompt of a job as a single user message
    pub fn for_job(job: &Job, context: Value) -> Self {
        let spec = JobSpec {
            name: job.name.clone(),
            template: job.template.clone(),
            instructions: job.instructions.clone(),
            data_sources: job.data_sources.clone(),
        };
        Self {
            messages: vec![ChatMessage::user(spec.prompt())],
            context: Some(context).filter(|c| !is_empty_context(c)),
        }
    }

    /// Conversation history followed by the new user message
    pub fn for_chat(history: &[ChatMessage], message: &str) -> Self {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(message));
        Self {
            messages,
            context: None,
        }
    }
}

fn is_empty_context(context: &Value) -> bool {
    match context {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Normalized remote run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Expired,
}

impl RemoteState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RemoteState::Queued | RemoteState::Running)
    }

    /// Maps a run status string as reported by the agent
    pub fn from_run_status(status: &str) -> Option<RemoteState> {
        match status {
            "queued" => Some(RemoteState::Queued),
            "in_progress" | "requires_action" | "cancelling" => Some(RemoteState::Running),
            "completed" => Some(RemoteState::Succeeded),
            "failed" => Some(RemoteState::Failed),
            "cancelled" => Some(RemoteState::Cancelled),
            "expired" => Some(RemoteState::Expired),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RemoteState::Queued => "queued",
            RemoteState::Running => "running",
            RemoteState::Succeeded => "succeeded",
            RemoteState::Failed => "failed",
            RemoteState::Cancelled => "cancelled",
            RemoteState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RemoteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status observation of a remote run
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStatus {
    pub state: RemoteState,
    /// Set when `state` is Succeeded
    pub result: Option<Value>,
    /// Failure detail reported by the agent, if any
    pub error_detail: Option<String>,
}

impl RemoteStatus {
    pub fn queued() -> Self {
        Self::pending(RemoteState::Queued)
    }

    pub fn running() -> Self {
        Self::pending(RemoteState::Running)
    }

    pub fn succeeded(result: Value) -> Self {
        Self {
            state: RemoteState::Succeeded,
            result: Some(result),
            error_detail: None,
        }
    }

    pub fn failed(state: RemoteState, error_detail: Option<String>) -> Self {
        Self {
            state,
            result: None,
            error_detail,
        }
    }

    fn pending(state: RemoteState) -> Self {
        Self {
            state,
            result: None,
            error_detail: None,
        }
    }
}

/// Operations the dispatcher needs from the external agent
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Starts a run; called exactly once per job
    async fn enqueue(&self, request: &AgentRequest) -> Result<ExternalRef>;

    /// Current state of a run, with its result once it succeeded
    async fn get_status(&self, external_ref: &ExternalRef) -> Result<RemoteStatus>;

    /// One synchronous chat-completions call; returns the raw response body
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Value>;

    /// Whether the threads/runs API is available
    fn supports_runs(&self) -> bool;
}

#[async_trait]
impl<T: AgentClient + ?Sized> AgentClient for Arc<T> {
    async fn enqueue(&self, request: &AgentRequest) -> Result<ExternalRef> {
        (**self).enqueue(request).await
    }

    async fn get_status(&self, external_ref: &ExternalRef) -> Result<RemoteStatus> {
        (**self).get_status(external_ref).await
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Value> {
        (**self).complete(messages).await
    }

    fn supports_runs(&self) -> bool {
        (**self).supports_runs()
    }
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    id: String,
    thread_id: String,
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RunError {
    fn detail(self) -> Option<String> {
        self.message
            .filter(|m| !m.trim().is_empty())
            .or(self.code)
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<Value>,
}

/// HTTP implementation of [`AgentClient`]
#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    config: Arc<AgentConfig>,
    credentials: Arc<ClientCredentials>,
    client: reqwest::Client,
}

impl HttpAgentClient {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a client with a custom HTTP client (timeouts, proxies, TLS)
    pub fn with_client(config: AgentConfig, client: reqwest::Client) -> Self {
        let credentials = ClientCredentials::new(&config, client.clone());
        Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            client,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint, path)
    }

    /// Sends with the cached token; a 401 is retried once with a fresh one
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = request.query(&[("api-version", self.config.api_version.as_str())]);
        let retry = request.try_clone();

        let response = self.send_authorized(request).await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        self.credentials.invalidate().await;

        let Some(retry) = retry else {
            return Ok(response);
        };
        tracing::warn!("Agent rejected the access token, retrying with a new one");
        let response = self.send_authorized(retry).await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.credentials.invalidate().await;
        }
        Ok(response)
    }

    async fn send_authorized(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let token = self.credentials.access_token().await?;
        Ok(request.bearer_auth(token).send().await?)
    }

    /// Text of the latest assistant message of a thread
    async fn latest_answer(&self, thread_id: &str) -> Result<Value> {
        let request = self
            .client
            .get(self.url(&format!("/threads/{}/messages", thread_id)))
            .query(&[("order", "desc"), ("limit", "1")]);
        let messages: MessageList = handle_response(self.send(request).await?).await?;

        let text = messages
            .data
            .iter()
            .find(|m| m.get("role").and_then(Value::as_str) == Some("assistant"))
            .map(extract_result)
            .unwrap_or_else(|| NO_RESPONSE.to_string());

        Ok(parse_answer(text))
    }
}

/// Structured answers are kept as-is, plain text is wrapped
fn parse_answer(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({ "response": text }),
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn enqueue(&self, request: &AgentRequest) -> Result<ExternalRef> {
        let agent_id = self.config.agent_id.as_deref().ok_or_else(|| {
            ClientError::InvalidRequest("AGENT_ID is not configured".to_string())
        })?;

        let mut body = json!({
            "assistant_id": agent_id,
            "thread": { "messages": request.messages },
        });
        if let Some(context) = &request.context {
            body["additional_instructions"] =
                Value::String(format!("Organization configuration: {}", context));
        }

        tracing::debug!(agent_id, "Creating agent thread and run");
        let request = self.client.post(self.url("/threads/runs")).json(&body);
        let run: RunResponse = handle_response(self.send(request).await?).await?;

        tracing::info!(thread_id = %run.thread_id, run_id = %run.id, status = %run.status, "Agent run created");
        Ok(ExternalRef {
            thread_id: run.thread_id,
            run_id: run.id,
        })
    }

    async fn get_status(&self, external_ref: &ExternalRef) -> Result<RemoteStatus> {
        let path = format!(
            "/threads/{}/runs/{}",
            external_ref.thread_id, external_ref.run_id
        );
        let request = self.client.get(self.url(&path));
        let run: RunResponse = handle_response(self.send(request).await?).await?;

        let state = RemoteState::from_run_status(&run.status).ok_or_else(|| {
            ClientError::Protocol(format!("unknown run status '{}'", run.status))
        })?;
        tracing::debug!(run = %external_ref, status = %run.status, "Run status");

        match state {
            RemoteState::Queued => Ok(RemoteStatus::queued()),
            RemoteState::Running => Ok(RemoteStatus::running()),
            RemoteState::Succeeded => {
                let result = self.latest_answer(&external_ref.thread_id).await?;
                Ok(RemoteStatus::succeeded(result))
            }
            RemoteState::Failed | RemoteState::Cancelled | RemoteState::Expired => Ok(
                RemoteStatus::failed(state, run.last_error.and_then(RunError::detail)),
            ),
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Value> {
        let body = json!({
            "messages": messages,
            "max_tokens": MAX_COMPLETION_TOKENS,
        });

        tracing::debug!(messages = messages.len(), "Calling chat completions");
        let request = self.client.post(&self.config.endpoint).json(&body);
        handle_response(self.send(request).await?).await
    }

    fn supports_runs(&self) -> bool {
        self.config.agent_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_run_status_mapping() {
        assert_eq!(RemoteState::from_run_status("queued"), Some(RemoteState::Queued));
        for running in ["in_progress", "requires_action", "cancelling"] {
            assert_eq!(RemoteState::from_run_status(running), Some(RemoteState::Running));
        }
        assert_eq!(
            RemoteState::from_run_status("completed"),
            Some(RemoteState::Succeeded)
        );
        assert_eq!(RemoteState::from_run_status("expired"), Some(RemoteState::Expired));
        assert_eq!(RemoteState::from_run_status("COMPLETED"), None);
        assert_eq!(RemoteState::from_run_status("paused"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RemoteState::Queued.is_terminal());
        assert!(!RemoteState::Running.is_terminal());
        assert!(RemoteState::Succeeded.is_terminal());
        assert!(RemoteState::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(
            parse_answer(r#"{"summary": "stable"}"#.to_string()),
            json!({"summary": "stable"})
        );
        assert_eq!(
            parse_answer("Exposure is stable".to_string()),
            json!({"response": "Exposure is stable"})
        );
        assert_eq!(parse_answer("[1, 2]".to_string()), json!({"response": "[1, 2]"}));
    }

    #[test]
    fn test_job_request() {
        let job = Job::new(
            JobSpec {
                name: "Q4 Risk".to_string(),
                template: "Credit Risk Summary".to_string(),
                instructions: None,
                data_sources: vec!["ledger".to_string()],
            },
            Uuid::new_v4(),
            None,
        );

        let request = AgentRequest::for_job(&job, json!({}));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert!(request.messages[0].content.contains("Credit Risk Summary"));
        assert_eq!(request.context, None);

        let request = AgentRequest::for_job(&job, json!({"region": "eu"}));
        assert_eq!(request.context, Some(json!({"region": "eu"})));
    }

    #[test]
    fn test_chat_request_appends_message() {
        let history = vec![
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi, how can I help?"),
        ];
        let request = AgentRequest::for_chat(&history, "show overdue accounts");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[2], ChatMessage::user("show overdue accounts"));
    }
}
