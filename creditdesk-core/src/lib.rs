//! CreditDesk Core
//!
//! Core types and abstractions shared by every CreditDesk service.
//!
//! This crate contains:
//! - Domain types: Jobs (reports), organizations, roles, schedules, audit entries
//! - DTOs: Request/response bodies exchanged between the server, CLI and dispatcher
//! - Result extraction: normalization of external agent responses
//! - Analytics: dashboard aggregates computed over jobs
//!
//! Nothing in here performs I/O.

pub mod analytics;
pub mod domain;
pub mod dto;
pub mod extract;
