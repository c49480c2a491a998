//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod auth;
pub mod chat;
pub mod error;
pub mod health;
pub mod job;
pub mod organization;
pub mod schedule;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Registration is the only unauthenticated write
        .route(
            "/organizations/register",
            post(organization::register_organization),
        )
        // Job endpoints
        .route("/jobs", post(job::submit_job).get(job::list_jobs))
        .route("/jobs/analytics", get(job::job_analytics))
        .route("/jobs/{id}", get(job::get_job))
        .route("/jobs/{id}/await", post(job::await_job))
        // Chat
        .route("/chat", post(chat::chat))
        // Schedules
        .route(
            "/schedules",
            post(schedule::create_schedule).get(schedule::list_schedules),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
