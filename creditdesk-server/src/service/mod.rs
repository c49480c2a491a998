//! Service Module
//!
//! Business logic layer for the server.
//! Services check the caller's organization and role, then orchestrate the
//! dispatcher and the directory store.

pub mod chat;
pub mod job;
pub mod organization;
pub mod schedule;

// Re-export for convenience
pub use chat as chat_service;
pub use job as job_service;
pub use organization as organization_service;
pub use schedule as schedule_service;

use creditdesk_core::domain::organization::AppRole;
use creditdesk_dispatcher::DispatchError;
use thiserror::Error;
use uuid::Uuid;

use crate::repository::DirectoryError;

/// An authenticated caller together with their organization membership
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub organization_id: Uuid,
    pub role: AppRole,
}

impl Caller {
    /// Rejects callers whose role is read-only
    pub fn require_submit(&self) -> Result<(), ServiceError> {
        if self.role.can_submit() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Insufficient permissions for this action".to_string(),
            ))
        }
    }

    /// Rejects requests naming another organization
    pub fn require_organization(&self, organization_id: Option<Uuid>) -> Result<(), ServiceError> {
        match organization_id {
            Some(id) if id != self.organization_id => Err(ServiceError::Forbidden(
                "Organization does not match the caller".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Service error type
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
