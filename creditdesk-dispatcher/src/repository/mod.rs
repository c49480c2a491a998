//! Repository layer
//!
//! The job store is the single source of truth for job records. Every
//! state change goes through `JobStore::update`, which applies one
//! `JobUpdate` atomically and refuses illegal transitions.

mod jobs;

pub use jobs::{InMemoryJobStore, JobStore, StoreError};
