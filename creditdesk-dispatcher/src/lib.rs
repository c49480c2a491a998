//! CreditDesk job dispatcher
//!
//! Runs long-lived report jobs on the external agent: a job is created,
//! enqueued once, then polled until the agent reports a terminal state.
//! Whatever happens remotely ends up on the job record as a result or an
//! error message.
//!
//! The dispatcher only depends on two seams: a [`JobStore`] for the records
//! and an [`AgentClient`](creditdesk_client::AgentClient) for the agent.

pub mod config;
pub mod error;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use config::{PollConfig, RetryPolicy};
pub use error::DispatchError;
pub use repository::{InMemoryJobStore, JobStore, StoreError};
pub use scheduler::{PollOutcome, Poller, poll_until_terminal};
pub use service::{ChatService, Dispatcher, Submission};
