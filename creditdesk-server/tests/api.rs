//! API tests: authentication, roles, jobs, chat, registration, schedules.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration as ChronoDuration, Utc};
use creditdesk_client::{RemoteStatus, ScriptedAgent, StaticIdentityProvider};
use creditdesk_core::domain::audit::AuditEntry;
use creditdesk_core::domain::organization::{AppRole, Organization, Profile, UserRole};
use creditdesk_core::domain::schedule::Schedule;
use creditdesk_dispatcher::{InMemoryJobStore, PollConfig};
use creditdesk_server::repository::{DirectoryError, DirectoryStore, InMemoryDirectoryStore};
use creditdesk_server::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;
use uuid::Uuid;

const ADMIN: &str = "admin-token";
const VIEWER: &str = "viewer-token";
const OUTSIDER: &str = "outsider-token";
const OTHER_ORG: &str = "other-org-token";

struct Harness {
    app: axum::Router,
    directory: Arc<InMemoryDirectoryStore>,
    agent: Arc<ScriptedAgent>,
    identity: Arc<StaticIdentityProvider>,
    organization_id: Uuid,
}

async fn harness(agent: ScriptedAgent) -> Harness {
    let directory = Arc::new(InMemoryDirectoryStore::new());

    let mut org = Organization::new("Acme Credit", "ops@acme.com");
    org.agent_config = json!({ "region": "eu-west" });
    directory.create_organization(&org).await.unwrap();
    let other = Organization::new("Globex", "ops@globex.com");
    directory.create_organization(&other).await.unwrap();

    let admin_id = Uuid::new_v4();
    let viewer_id = Uuid::new_v4();
    let other_id = Uuid::new_v4();
    for (user_id, organization_id, role) in [
        (admin_id, org.id, AppRole::Admin),
        (viewer_id, org.id, AppRole::Viewer),
        (other_id, other.id, AppRole::Admin),
    ] {
        directory
            .insert_role(&UserRole {
                user_id,
                organization_id,
                role,
            })
            .await
            .unwrap();
    }

    let identity = Arc::new(
        StaticIdentityProvider::new()
            .with_user(ADMIN, admin_id)
            .with_user(VIEWER, viewer_id)
            .with_user(OTHER_ORG, other_id)
            .with_user(OUTSIDER, Uuid::new_v4()),
    );
    let agent = Arc::new(agent);

    let state = AppState::new(
        Arc::new(InMemoryJobStore::new()),
        directory.clone(),
        agent.clone(),
        identity.clone(),
        PollConfig::new(5, Duration::from_millis(1)),
        CancellationToken::new(),
    );

    Harness {
        app: create_router(state),
        directory,
        agent,
        identity,
        organization_id: org.id,
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn report() -> Value {
    json!({
        "name": "Q3 exposure",
        "template": "Portfolio Risk Assessment",
        "instructions": "Focus on energy",
        "data_sources": ["loans"]
    })
}

fn succeeding_agent() -> ScriptedAgent {
    ScriptedAgent::with_statuses([
        RemoteStatus::running(),
        RemoteStatus::succeeded(json!({ "response": "Exposure is within limits" })),
    ])
}

#[tokio::test]
async fn health_needs_no_auth() {
    let h = harness(ScriptedAgent::new()).await;
    let res = h
        .app
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() {
    let h = harness(ScriptedAgent::new()).await;

    let (status, body) = send(&h.app, request("GET", "/jobs", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization required");

    let (status, body) = send(&h.app, request("GET", "/jobs", Some("nope"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authentication");
}

#[tokio::test]
async fn user_without_organization_is_forbidden() {
    let h = harness(ScriptedAgent::new()).await;
    let (status, body) = send(&h.app, request("GET", "/jobs", Some(OUTSIDER), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User not assigned to an organization");
}

#[tokio::test]
async fn submit_and_wait_returns_completed_job() {
    let h = harness(succeeding_agent()).await;

    let (status, job) = send(
        &h.app,
        request("POST", "/jobs?wait=true", Some(ADMIN), Some(report())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "completed");
    assert_eq!(job["result"]["response"], "Exposure is within limits");
    assert_eq!(job["organization_id"], h.organization_id.to_string());
    assert!(job["completed_at"].is_string());
    assert!(job.get("external_ref").is_none());

    // Organization settings travel with the enqueue
    let sent = h.agent.last_request().unwrap();
    assert_eq!(sent.context, Some(json!({ "region": "eu-west" })));
}

#[tokio::test]
async fn submit_records_audit_entry() {
    let h = harness(succeeding_agent()).await;

    let (_, job) = send(
        &h.app,
        request("POST", "/jobs?wait=true", Some(ADMIN), Some(report())),
    )
    .await;

    let entries = h.directory.audit_entries(h.organization_id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "trigger_analysis");
    assert_eq!(entries[0].resource_type, "report");
    assert_eq!(entries[0].resource_id.as_deref(), job["id"].as_str());
    assert_eq!(entries[0].details["template"], "Portfolio Risk Assessment");
    assert_eq!(entries[0].details["instructions"], "Focus on energy");
}

#[tokio::test]
async fn submit_without_wait_returns_processing_job() {
    let h = harness(ScriptedAgent::new()).await;

    let (status, job) = send(&h.app, request("POST", "/jobs", Some(ADMIN), Some(report()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "processing");
    assert_eq!(h.agent.enqueue_calls(), 1);
}

#[tokio::test]
async fn refused_enqueue_yields_failed_job() {
    let h = harness(ScriptedAgent::new().failing_enqueue("quota exceeded")).await;

    let (status, job) = send(&h.app, request("POST", "/jobs", Some(ADMIN), Some(report()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "failed");
    assert_eq!(job["error_message"], "Agent returned 500: quota exceeded");
    assert!(job["result"].is_null());
}

#[tokio::test]
async fn viewer_cannot_submit() {
    let h = harness(succeeding_agent()).await;

    let (status, _) = send(&h.app, request("POST", "/jobs", Some(VIEWER), Some(report()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.agent.enqueue_calls(), 0);

    // Reading is still allowed
    let (status, jobs) = send(&h.app, request("GET", "/jobs", Some(VIEWER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs, json!([]));
}

#[tokio::test]
async fn submit_for_another_organization_is_forbidden() {
    let h = harness(succeeding_agent()).await;

    let mut body = report();
    body["organization_id"] = json!(Uuid::new_v4());
    let (status, _) = send(&h.app, request("POST", "/jobs", Some(ADMIN), Some(body))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.agent.enqueue_calls(), 0);
}

#[tokio::test]
async fn invalid_report_is_rejected_before_dispatch() {
    let h = harness(succeeding_agent()).await;

    let mut body = report();
    body["name"] = json!("  ");
    let (status, error) = send(&h.app, request("POST", "/jobs", Some(ADMIN), Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Report name is required");

    let (_, jobs) = send(&h.app, request("GET", "/jobs", Some(ADMIN), None)).await;
    assert_eq!(jobs, json!([]));
    assert_eq!(h.agent.enqueue_calls(), 0);
}

#[tokio::test]
async fn jobs_are_scoped_to_the_organization() {
    let h = harness(succeeding_agent()).await;

    let (_, job) = send(
        &h.app,
        request("POST", "/jobs?wait=true", Some(ADMIN), Some(report())),
    )
    .await;
    let uri = format!("/jobs/{}", job["id"].as_str().unwrap());

    let (status, fetched) = send(&h.app, request("GET", &uri, Some(VIEWER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], job["id"]);

    let (status, _) = send(&h.app, request("GET", &uri, Some(OTHER_ORG), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(&h.app, request("GET", "/jobs", Some(OTHER_ORG), None)).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let h = harness(ScriptedAgent::new()).await;
    let uri = format!("/jobs/{}", Uuid::new_v4());
    let (status, body) = send(&h.app, request("GET", &uri, Some(ADMIN), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().ends_with("not found"));
}

#[tokio::test]
async fn awaiting_a_terminal_job_returns_snapshot() {
    let h = harness(succeeding_agent()).await;

    let (_, job) = send(
        &h.app,
        request("POST", "/jobs?wait=true", Some(ADMIN), Some(report())),
    )
    .await;
    let polls = h.agent.status_calls();

    let uri = format!("/jobs/{}/await", job["id"].as_str().unwrap());
    let (status, awaited) = send(&h.app, request("POST", &uri, Some(ADMIN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(awaited, job);
    assert_eq!(h.agent.status_calls(), polls);
}

#[tokio::test]
async fn awaiting_times_out_into_failed_job() {
    let h = harness(ScriptedAgent::new()).await;

    let (_, job) = send(
        &h.app,
        request("POST", "/jobs?wait=true", Some(ADMIN), Some(report())),
    )
    .await;

    assert_eq!(job["status"], "failed");
    assert_eq!(job["error_message"], "timed out waiting for completion");
    assert_eq!(h.agent.status_calls(), 5);
}

#[tokio::test]
async fn analytics_covers_requested_window() {
    let h = harness(succeeding_agent()).await;
    send(
        &h.app,
        request("POST", "/jobs?wait=true", Some(ADMIN), Some(report())),
    )
    .await;

    let (status, analytics) = send(&h.app, request("GET", "/jobs/analytics", Some(ADMIN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["activity"].as_array().unwrap().len(), 7);
    assert_eq!(analytics["templates"][0]["template"], "Portfolio Risk");
    assert_eq!(analytics["templates"][0]["count"], 1);

    let (_, analytics) = send(
        &h.app,
        request("GET", "/jobs/analytics?days=30", Some(ADMIN), None),
    )
    .await;
    assert_eq!(analytics["activity"].as_array().unwrap().len(), 30);
}

#[tokio::test]
async fn chat_in_completions_mode() {
    let agent = ScriptedAgent::new()
        .without_runs()
        .with_completion(json!({ "choices": [{ "message": { "content": "Hello there" } }] }));
    let h = harness(agent).await;

    let body = json!({
        "message": "Hi",
        "conversation_history": [{ "role": "user", "content": "earlier" }]
    });
    let (status, reply) = send(&h.app, request("POST", "/chat", Some(VIEWER), Some(body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response"], "Hello there");
    assert!(reply.get("error").is_none());
    assert_eq!(h.agent.last_messages().len(), 2);
}

#[tokio::test]
async fn chat_failure_is_an_apology() {
    let h = harness(ScriptedAgent::new().without_runs().failing_completion("down")).await;

    let (status, reply) = send(
        &h.app,
        request("POST", "/chat", Some(ADMIN), Some(json!({ "message": "Hi" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reply["response"].as_str().unwrap().starts_with("I apologize"));
    assert!(reply["error"].is_string());
}

#[tokio::test]
async fn empty_chat_message_is_rejected() {
    let h = harness(ScriptedAgent::new()).await;
    let (status, body) = send(
        &h.app,
        request("POST", "/chat", Some(ADMIN), Some(json!({ "message": "" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");
}

fn registration() -> Value {
    json!({
        "organization_name": "Initech",
        "organization_email": "hello@initech.com",
        "admin_email": "admin@initech.com",
        "password": "correct horse"
    })
}

#[tokio::test]
async fn registration_creates_organization_and_admin() {
    let h = harness(ScriptedAgent::new()).await;

    let (status, receipt) = send(
        &h.app,
        request("POST", "/organizations/register", None, Some(registration())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["success"], true);

    let organization_id: Uuid = serde_json::from_value(receipt["organization_id"].clone()).unwrap();
    let user_id: Uuid = serde_json::from_value(receipt["user_id"].clone()).unwrap();

    let org = h.directory.get_organization(organization_id).await.unwrap().unwrap();
    assert_eq!(org.name, "Initech");
    assert_eq!(org.domain.as_deref(), Some("initech.com"));

    let role = h.directory.role_for_user(user_id).await.unwrap().unwrap();
    assert_eq!(role.role, AppRole::Admin);
    assert_eq!(role.organization_id, organization_id);
}

#[tokio::test]
async fn registration_requires_all_fields() {
    let h = harness(ScriptedAgent::new()).await;
    let mut body = registration();
    body["password"] = json!("");

    let (status, error) = send(
        &h.app,
        request("POST", "/organizations/register", None, Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "All fields are required");
    assert!(h.identity.created_users().is_empty());
}

#[tokio::test]
async fn registration_rolls_back_organization_when_user_fails() {
    let h = harness(ScriptedAgent::new()).await;

    // Same admin twice: the provider rejects the second account
    send(
        &h.app,
        request("POST", "/organizations/register", None, Some(registration())),
    )
    .await;
    let before = h.directory.organization_count().await;

    let (status, error) = send(
        &h.app,
        request("POST", "/organizations/register", None, Some(registration())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Failed to create user: User already registered");
    assert_eq!(h.directory.organization_count().await, before);
}

/// Directory that refuses every role assignment
struct RoleRefusingDirectory {
    inner: InMemoryDirectoryStore,
}

#[async_trait]
impl DirectoryStore for RoleRefusingDirectory {
    async fn create_organization(&self, organization: &Organization) -> Result<(), DirectoryError> {
        self.inner.create_organization(organization).await
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DirectoryError> {
        self.inner.get_organization(id).await
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), DirectoryError> {
        self.inner.delete_organization(id).await
    }

    async fn insert_role(&self, _role: &UserRole) -> Result<(), DirectoryError> {
        Err(DirectoryError::Backend("connection reset".to_string()))
    }

    async fn role_for_user(&self, user_id: Uuid) -> Result<Option<UserRole>, DirectoryError> {
        self.inner.role_for_user(user_id).await
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), DirectoryError> {
        self.inner.insert_profile(profile).await
    }

    async fn create_schedule(&self, schedule: &Schedule) -> Result<(), DirectoryError> {
        self.inner.create_schedule(schedule).await
    }

    async fn list_schedules(&self, organization_id: Uuid) -> Result<Vec<Schedule>, DirectoryError> {
        self.inner.list_schedules(organization_id).await
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), DirectoryError> {
        self.inner.record_audit(entry).await
    }
}

#[tokio::test]
async fn registration_rolls_back_user_and_organization_when_role_fails() {
    let directory = Arc::new(RoleRefusingDirectory {
        inner: InMemoryDirectoryStore::new(),
    });
    let identity = Arc::new(StaticIdentityProvider::new());
    let state = AppState::new(
        Arc::new(InMemoryJobStore::new()),
        directory.clone(),
        Arc::new(ScriptedAgent::new()),
        identity.clone(),
        PollConfig::default(),
        CancellationToken::new(),
    );
    let app = create_router(state);

    let (status, error) = send(
        &app,
        request("POST", "/organizations/register", None, Some(registration())),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["error"], "Internal server error");

    let created = identity.created_users();
    assert_eq!(created.len(), 1);
    assert_eq!(identity.deleted_users(), vec![created[0].0]);
    assert_eq!(directory.inner.organization_count().await, 0);
}

fn schedule_body(next_run_at: chrono::DateTime<Utc>) -> Value {
    json!({
        "name": "Weekly exposure",
        "template": "Portfolio Risk Assessment",
        "recurrence": "weekly",
        "next_run_at": next_run_at,
        "recipients": ["cro@acme.com"]
    })
}

#[tokio::test]
async fn schedules_are_created_and_listed() {
    let h = harness(ScriptedAgent::new()).await;

    let (status, schedule) = send(
        &h.app,
        request(
            "POST",
            "/schedules",
            Some(ADMIN),
            Some(schedule_body(Utc::now() + ChronoDuration::days(1))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(schedule["recurrence"], "weekly");
    assert_eq!(schedule["timezone"], "UTC");
    assert_eq!(schedule["is_active"], true);

    let (status, schedules) = send(&h.app, request("GET", "/schedules", Some(VIEWER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schedules.as_array().unwrap().len(), 1);

    let entries = h.directory.audit_entries(h.organization_id).await;
    assert_eq!(entries[0].action, "create_schedule");
}

#[tokio::test]
async fn schedule_validation_and_permissions() {
    let h = harness(ScriptedAgent::new()).await;

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            "/schedules",
            Some(VIEWER),
            Some(schedule_body(Utc::now() + ChronoDuration::days(1))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            "/schedules",
            Some(ADMIN),
            Some(schedule_body(Utc::now() - ChronoDuration::days(1))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut unnamed = schedule_body(Utc::now() + ChronoDuration::days(1));
    unnamed["name"] = json!("");
    let (status, error) = send(&h.app, request("POST", "/schedules", Some(ADMIN), Some(unnamed))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Please fill in all required fields");
}
