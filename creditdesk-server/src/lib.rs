//! CreditDesk Server
//!
//! HTTP API in front of the job dispatcher: bearer authentication,
//! organization registration, jobs, chat, schedules and analytics.

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod shutdown;
pub mod state;

pub use api::create_router;
pub use state::AppState;
