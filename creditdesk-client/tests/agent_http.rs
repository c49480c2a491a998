//! HTTP clients against a local stub of the agent and identity APIs

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use creditdesk_client::{
    AgentClient, AgentConfig, AgentRequest, AuthError, ClientError, HttpAgentClient,
    HttpIdentityProvider, IdentityConfig, IdentityProvider, RemoteState,
};
use creditdesk_core::domain::chat::ChatMessage;
use creditdesk_core::domain::job::ExternalRef;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const USER_ID: &str = "6f1c2f6e-8a3b-4f4e-9d7a-2b1f3c4d5e6f";

#[derive(Default)]
struct Stub {
    token_calls: AtomicUsize,
    /// Number of upcoming token exchanges that hand out a revoked token
    stale_tokens: AtomicUsize,
    expires_in: Mutex<Option<u64>>,
    run_statuses: Mutex<Vec<Value>>,
    last_run_body: Mutex<Option<Value>>,
    last_query: Mutex<HashMap<String, String>>,
}

fn authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", token))
        .unwrap_or(false)
}

async fn token(State(stub): State<Arc<Stub>>, body: String) -> (StatusCode, Json<Value>) {
    stub.token_calls.fetch_add(1, Ordering::SeqCst);
    if !body.contains("grant_type=client_credentials") || !body.contains("client_secret=secret") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_client"})));
    }
    let access_token = if stub.stale_tokens.load(Ordering::SeqCst) > 0 {
        stub.stale_tokens.fetch_sub(1, Ordering::SeqCst);
        "revoked-token"
    } else {
        "agent-token"
    };
    let expires_in = stub.expires_in.lock().unwrap().unwrap_or(3600);
    (
        StatusCode::OK,
        Json(json!({"access_token": access_token, "expires_in": expires_in, "token_type": "Bearer"})),
    )
}

async fn create_run(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers, "agent-token") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    *stub.last_query.lock().unwrap() = query;
    *stub.last_run_body.lock().unwrap() = Some(body);
    (
        StatusCode::OK,
        Json(json!({"id": "run_abc", "thread_id": "thread_abc", "status": "queued"})),
    )
}

async fn get_run(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Path((thread_id, run_id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers, "agent-token") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    if thread_id != "thread_abc" || run_id != "run_abc" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "no such run"})));
    }
    let mut statuses = stub.run_statuses.lock().unwrap();
    let run = if statuses.len() > 1 {
        statuses.remove(0)
    } else {
        statuses[0].clone()
    };
    (StatusCode::OK, Json(run))
}

async fn list_messages(
    Path(_thread_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert_eq!(query.get("order").map(String::as_str), Some("desc"));
    Json(json!({
        "data": [{
            "role": "assistant",
            "content": [{"type": "text", "text": {"value": "{\"summary\": \"stable\"}", "annotations": []}}]
        }]
    }))
}

async fn completions(Json(body): Json<Value>) -> Json<Value> {
    let count = body["messages"].as_array().map(|m| m.len()).unwrap_or(0);
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": format!("saw {} messages", count)}}]
    }))
}

async fn current_user(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if headers.get("apikey").is_none() || !authorized(&headers, "user-token") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"})));
    }
    (
        StatusCode::OK,
        Json(json!({"id": USER_ID, "email": "analyst@acme.com"})),
    )
}

async fn spawn_stub(stub: Arc<Stub>) -> String {
    let app = Router::new()
        .route("/tenant/oauth2/v2.0/token", post(token))
        .route("/agent", post(completions))
        .route("/agent/threads/runs", post(create_run))
        .route("/agent/threads/{thread_id}/runs/{run_id}", get(get_run))
        .route("/agent/threads/{thread_id}/messages", get(list_messages))
        .route("/auth/v1/user", get(current_user))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn agent_config(base: &str, agent_id: Option<&str>) -> AgentConfig {
    AgentConfig {
        tenant_id: "tenant".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        endpoint: format!("{}/agent", base),
        agent_id: agent_id.map(str::to_string),
        api_version: "v1".to_string(),
        scope: "https://cognitiveservices.azure.com/.default".to_string(),
        authority_url: base.to_string(),
    }
}

fn external_ref() -> ExternalRef {
    ExternalRef {
        thread_id: "thread_abc".to_string(),
        run_id: "run_abc".to_string(),
    }
}

#[tokio::test]
async fn test_enqueue_creates_thread_and_run() {
    let stub = Arc::new(Stub::default());
    let base = spawn_stub(stub.clone()).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let request = AgentRequest {
        messages: vec![ChatMessage::user("Report: Q4\nTemplate: Credit Risk")],
        context: Some(json!({"region": "eu"})),
    };
    let external_ref = agent.enqueue(&request).await.unwrap();
    assert_eq!(external_ref.thread_id, "thread_abc");
    assert_eq!(external_ref.run_id, "run_abc");

    let body = stub.last_run_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["assistant_id"], "asst_1");
    assert_eq!(body["thread"]["messages"][0]["role"], "user");
    assert!(
        body["additional_instructions"]
            .as_str()
            .unwrap()
            .contains("region")
    );
    assert_eq!(
        stub.last_query.lock().unwrap().get("api-version").map(String::as_str),
        Some("v1")
    );
}

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let stub = Arc::new(Stub::default());
    *stub.run_statuses.lock().unwrap() = vec![json!({"id": "run_abc", "thread_id": "thread_abc", "status": "in_progress"})];
    let base = spawn_stub(stub.clone()).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    agent.enqueue(&AgentRequest::for_chat(&[], "hi")).await.unwrap();
    agent.get_status(&external_ref()).await.unwrap();
    agent.get_status(&external_ref()).await.unwrap();

    assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refused_token_is_replaced_once() {
    let stub = Arc::new(Stub::default());
    stub.stale_tokens.store(1, Ordering::SeqCst);
    *stub.run_statuses.lock().unwrap() = vec![json!({"id": "run_abc", "thread_id": "thread_abc", "status": "in_progress"})];
    let base = spawn_stub(stub.clone()).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let status = agent.get_status(&external_ref()).await.unwrap();
    assert_eq!(status.state, RemoteState::Running);
    assert_eq!(stub.token_calls.load(Ordering::SeqCst), 2);

    // The replacement token is cached
    agent.enqueue(&AgentRequest::for_chat(&[], "hi")).await.unwrap();
    assert_eq!(stub.token_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_repeated_refusal_is_api_error() {
    let stub = Arc::new(Stub::default());
    stub.stale_tokens.store(5, Ordering::SeqCst);
    let base = spawn_stub(stub.clone()).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let err = agent.enqueue(&AgentRequest::for_chat(&[], "hi")).await.unwrap_err();
    assert!(matches!(err, ClientError::ApiError { status: 401, .. }));
    assert!(!err.is_transport());
    assert_eq!(stub.token_calls.load(Ordering::SeqCst), 2);
    assert!(stub.last_run_body.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_huge_token_lifetime_is_accepted() {
    let stub = Arc::new(Stub::default());
    *stub.expires_in.lock().unwrap() = Some(u64::MAX);
    *stub.run_statuses.lock().unwrap() = vec![json!({"id": "run_abc", "thread_id": "thread_abc", "status": "queued"})];
    let base = spawn_stub(stub.clone()).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let status = agent.get_status(&external_ref()).await.unwrap();
    assert_eq!(status.state, RemoteState::Queued);
    agent.get_status(&external_ref()).await.unwrap();
    assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_status_progression_and_result() {
    let stub = Arc::new(Stub::default());
    *stub.run_statuses.lock().unwrap() = vec![
        json!({"id": "run_abc", "thread_id": "thread_abc", "status": "queued"}),
        json!({"id": "run_abc", "thread_id": "thread_abc", "status": "requires_action"}),
        json!({"id": "run_abc", "thread_id": "thread_abc", "status": "completed"}),
    ];
    let base = spawn_stub(stub.clone()).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let first = agent.get_status(&external_ref()).await.unwrap();
    assert_eq!(first.state, RemoteState::Queued);
    let second = agent.get_status(&external_ref()).await.unwrap();
    assert_eq!(second.state, RemoteState::Running);
    let last = agent.get_status(&external_ref()).await.unwrap();
    assert_eq!(last.state, RemoteState::Succeeded);
    assert_eq!(last.result, Some(json!({"summary": "stable"})));
}

#[tokio::test]
async fn test_failed_run_carries_detail() {
    let stub = Arc::new(Stub::default());
    *stub.run_statuses.lock().unwrap() = vec![json!({
        "id": "run_abc",
        "thread_id": "thread_abc",
        "status": "failed",
        "last_error": {"code": "rate_limit_exceeded", "message": "quota exhausted"}
    })];
    let base = spawn_stub(stub).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let status = agent.get_status(&external_ref()).await.unwrap();
    assert_eq!(status.state, RemoteState::Failed);
    assert_eq!(status.error_detail.as_deref(), Some("quota exhausted"));
    assert!(status.result.is_none());
}

#[tokio::test]
async fn test_unknown_status_is_protocol_error() {
    let stub = Arc::new(Stub::default());
    *stub.run_statuses.lock().unwrap() = vec![json!({"id": "run_abc", "thread_id": "thread_abc", "status": "paused"})];
    let base = spawn_stub(stub).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let err = agent.get_status(&external_ref()).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn test_missing_run_is_api_error() {
    let stub = Arc::new(Stub::default());
    let base = spawn_stub(stub).await;
    let agent = HttpAgentClient::new(agent_config(&base, Some("asst_1")));

    let missing = ExternalRef {
        thread_id: "thread_other".to_string(),
        run_id: "run_other".to_string(),
    };
    let err = agent.get_status(&missing).await.unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_enqueue_requires_agent_id() {
    let stub = Arc::new(Stub::default());
    let base = spawn_stub(stub).await;
    let agent = HttpAgentClient::new(agent_config(&base, None));

    assert!(!agent.supports_runs());
    let err = agent.enqueue(&AgentRequest::for_chat(&[], "hi")).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_chat_completion() {
    let stub = Arc::new(Stub::default());
    let base = spawn_stub(stub).await;
    let agent = HttpAgentClient::new(agent_config(&base, None));

    let body = agent
        .complete(&[ChatMessage::user("hello"), ChatMessage::assistant("hi"), ChatMessage::user("exposure?")])
        .await
        .unwrap();
    assert_eq!(body["choices"][0]["message"]["content"], "saw 3 messages");
}

#[tokio::test]
async fn test_bad_client_secret_is_unauthorized() {
    let stub = Arc::new(Stub::default());
    let base = spawn_stub(stub).await;
    let mut config = agent_config(&base, Some("asst_1"));
    config.client_secret = "wrong".to_string();
    let agent = HttpAgentClient::new(config);

    let err = agent.enqueue(&AgentRequest::for_chat(&[], "hi")).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
}

#[tokio::test]
async fn test_identity_verify() {
    let stub = Arc::new(Stub::default());
    let base = spawn_stub(stub).await;
    let identity = HttpIdentityProvider::new(IdentityConfig {
        url: base,
        anon_key: "anon".to_string(),
        service_key: None,
    });

    let caller = identity.verify("user-token").await.unwrap();
    assert_eq!(caller.user_id, Uuid::parse_str(USER_ID).unwrap());
    assert_eq!(caller.email.as_deref(), Some("analyst@acme.com"));

    assert_eq!(
        identity.verify("forged").await.unwrap_err(),
        AuthError::InvalidCredential
    );
    assert_eq!(identity.verify("").await.unwrap_err(), AuthError::MissingCredential);

    let err = identity.create_user("a@acme.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Unavailable(_)));
}
