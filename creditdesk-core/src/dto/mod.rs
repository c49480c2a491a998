//! Data Transfer Objects
//!
//! Request and response bodies exchanged between the CreditDesk server and its
//! callers (CLI, dashboard front-end).

pub mod chat;
pub mod job;
pub mod organization;
pub mod schedule;
