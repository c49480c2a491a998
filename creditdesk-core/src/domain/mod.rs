//! Core domain types
//!
//! These types represent the business entities of CreditDesk. They are shared
//! between the server (persistence), the dispatcher (job lifecycle) and the
//! CLI (display).

pub mod audit;
pub mod chat;
pub mod job;
pub mod organization;
pub mod schedule;
