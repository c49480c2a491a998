//! Scripted doubles for tests: no network, deterministic answers.

use async_trait::async_trait;
use creditdesk_core::domain::chat::ChatMessage;
use creditdesk_core::domain::job::ExternalRef;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::agent::{AgentClient, AgentRequest, RemoteStatus};
use crate::error::{ClientError, Result};
use crate::identity::{AuthError, CallerIdentity, IdentityProvider};

/// One scripted answer to a status query
#[derive(Debug, Clone)]
pub enum Step {
    Status(RemoteStatus),
    /// Answered as an HTTP 503
    TransportError(String),
    /// A response the protocol does not allow
    ProtocolError(String),
}

/// Agent whose status answers follow a script
///
/// Steps are consumed in order; the last one repeats forever. With no steps
/// every query answers Running.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    steps: Mutex<VecDeque<Step>>,
    enqueue_error: Option<String>,
    completion: Option<std::result::Result<Value, String>>,
    without_runs: bool,
    status_delay: Option<Duration>,
    enqueue_calls: AtomicUsize,
    status_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    last_request: Mutex<Option<AgentRequest>>,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Status answers only, no errors
    pub fn with_statuses(statuses: impl IntoIterator<Item = RemoteStatus>) -> Self {
        Self::with_steps(statuses.into_iter().map(Step::Status))
    }

    /// Every enqueue fails with an HTTP 500 carrying `message`
    pub fn failing_enqueue(mut self, message: impl Into<String>) -> Self {
        self.enqueue_error = Some(message.into());
        self
    }

    pub fn with_completion(mut self, body: Value) -> Self {
        self.completion = Some(Ok(body));
        self
    }

    pub fn failing_completion(mut self, message: impl Into<String>) -> Self {
        self.completion = Some(Err(message.into()));
        self
    }

    /// Behave like an agent without an assistant id (completions only)
    pub fn without_runs(mut self) -> Self {
        self.without_runs = true;
        self
    }

    /// Delay every status answer, to keep a poll loop busy
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn enqueue_calls(&self) -> usize {
        self.enqueue_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AgentRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps
                .front()
                .cloned()
                .unwrap_or_else(|| Step::Status(RemoteStatus::running()))
        }
    }
}

#[async_trait]
impl AgentClient for ScriptedAgent {
    async fn enqueue(&self, request: &AgentRequest) -> Result<ExternalRef> {
        let n = self.enqueue_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(message) = &self.enqueue_error {
            return Err(ClientError::api_error(500, message.clone()));
        }
        Ok(ExternalRef {
            thread_id: format!("thread_{}", n),
            run_id: format!("run_{}", n),
        })
    }

    async fn get_status(&self, _external_ref: &ExternalRef) -> Result<RemoteStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_step() {
            Step::Status(status) => Ok(status),
            Step::TransportError(message) => Err(ClientError::api_error(503, message)),
            Step::ProtocolError(message) => Err(ClientError::Protocol(message)),
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Value> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();

        match &self.completion {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(ClientError::api_error(500, message.clone())),
            None => Ok(Value::Null),
        }
    }

    fn supports_runs(&self) -> bool {
        !self.without_runs
    }
}

/// Identity provider backed by a fixed token table
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, CallerIdentity>,
    create_error: Option<String>,
    created: Mutex<Vec<(Uuid, String)>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as belonging to `user_id`
    pub fn with_user(mut self, token: impl Into<String>, user_id: Uuid) -> Self {
        self.tokens.insert(
            token.into(),
            CallerIdentity {
                user_id,
                email: None,
            },
        );
        self
    }

    pub fn failing_create_user(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }

    pub fn created_users(&self) -> Vec<(Uuid, String)> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted_users(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, bearer: &str) -> std::result::Result<CallerIdentity, AuthError> {
        if bearer.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }
        self.tokens
            .get(bearer)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }

    async fn create_user(
        &self,
        email: &str,
        _password: &str,
    ) -> std::result::Result<Uuid, AuthError> {
        if let Some(message) = &self.create_error {
            return Err(AuthError::Rejected(message.clone()));
        }
        let mut created = self.created.lock().unwrap();
        if created.iter().any(|(_, existing)| existing == email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        let user_id = Uuid::new_v4();
        created.push((user_id, email.to_string()));
        Ok(user_id)
    }

    async fn delete_user(&self, user_id: Uuid) -> std::result::Result<(), AuthError> {
        self.deleted.lock().unwrap().push(user_id);
        Ok(())
    }
}
