//! Jobs repository

use async_trait::async_trait;
use creditdesk_core::domain::job::{Job, JobUpdate, TransitionError};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("job store error: {0}")]
    Backend(String),
}

/// Persistence for job records
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    /// Applies one update to a single job and returns the new snapshot
    ///
    /// Implementations must check the current status and write the new one
    /// in a single step, so that two writers can never both move a job out
    /// of the same state.
    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Jobs of one organization, most recent first
    async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<Job>, StoreError>;
}

/// Job store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Backend(format!("job {} already exists", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.apply(update)?;
        Ok(job.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.organization_id == organization_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(jobs)
    }
}
