//! Dispatcher errors
//!
//! Failures of the remote job itself never show up here: they are recorded
//! on the job as its error message. These errors are about the request.

use creditdesk_core::domain::job::JobStatus;
use thiserror::Error;
use uuid::Uuid;

use crate::repository::StoreError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    InvalidSpec(String),

    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {id} is {status} and cannot be awaited")]
    InvalidState { id: Uuid, status: JobStatus },

    #[error("job {0} is already being polled")]
    AlreadyPolling(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
