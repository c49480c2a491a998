//! Job dispatch
//!
//! Creates job records, hands them to the agent exactly once, and starts
//! tracking them. A submission always yields a job: refusals by the agent
//! are recorded on the job instead of being returned as errors.

use creditdesk_client::{AgentClient, AgentRequest, ClientError};
use creditdesk_core::domain::job::{Job, JobSpec, JobStatus, JobUpdate};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PollConfig;
use crate::error::DispatchError;
use crate::repository::JobStore;
use crate::scheduler::Poller;

/// A job request on behalf of a caller
#[derive(Debug, Clone)]
pub struct Submission {
    pub organization_id: Uuid,
    pub created_by: Option<Uuid>,
    pub spec: JobSpec,
    /// Organization settings forwarded to the agent
    pub context: Value,
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    agent: Arc<dyn AgentClient>,
    poller: Poller,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        agent: Arc<dyn AgentClient>,
        config: PollConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let poller = Poller::new(Arc::clone(&store), Arc::clone(&agent), config);
        Self {
            store,
            agent,
            poller,
            shutdown,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Creates the job and enqueues it with the agent
    ///
    /// Returns once the enqueue call finished: the job is Processing, or
    /// Failed if the agent refused it. The enqueue is never retried.
    pub async fn submit(&self, submission: Submission) -> Result<Job, DispatchError> {
        submission.spec.validate().map_err(DispatchError::InvalidSpec)?;

        let job = Job::new(
            submission.spec,
            submission.organization_id,
            submission.created_by,
        );
        self.store.create(&job).await?;
        info!(job_id = %job.id, template = %job.template, "Job created");

        let request = AgentRequest::for_job(&job, submission.context);
        let update = match self.agent.enqueue(&request).await {
            Ok(external_ref) => {
                info!(job_id = %job.id, run = %external_ref, "Job dispatched");
                JobUpdate::Dispatched { external_ref }
            }
            Err(e) => {
                error!(job_id = %job.id, "Failed to enqueue job: {}", e);
                JobUpdate::failed(enqueue_failure(&e))
            }
        };

        let external_ref = match &update {
            JobUpdate::Dispatched { external_ref } => Some(external_ref.clone()),
            _ => None,
        };
        match self.store.update(job.id, update).await {
            Ok(job) => Ok(job),
            Err(e) => {
                // The run exists remotely but the row is still Pending
                if let Some(external_ref) = external_ref {
                    error!(
                        job_id = %job.id,
                        thread_id = %external_ref.thread_id,
                        run_id = %external_ref.run_id,
                        "Job enqueued but its run could not be recorded: {}", e
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Submits the job and polls it in the background
    ///
    /// The poll task stops when the dispatcher shuts down.
    pub async fn submit_and_track(&self, submission: Submission) -> Result<Job, DispatchError> {
        let job = self.submit(submission).await?;
        if job.status == JobStatus::Processing {
            self.track(job.id);
        }
        Ok(job)
    }

    /// Submits the job and waits for its terminal state
    pub async fn submit_and_wait(&self, submission: Submission) -> Result<Job, DispatchError> {
        let job = self.submit(submission).await?;
        if job.status != JobStatus::Processing {
            return Ok(job);
        }
        self.await_completion(job.id).await
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, DispatchError> {
        self.store
            .get(job_id)
            .await?
            .ok_or(DispatchError::NotFound(job_id))
    }

    pub async fn list_jobs(&self, organization_id: Uuid) -> Result<Vec<Job>, DispatchError> {
        Ok(self.store.list_by_organization(organization_id).await?)
    }

    /// Polls the job until it is terminal, unless the dispatcher shuts down first
    pub async fn await_completion(&self, job_id: Uuid) -> Result<Job, DispatchError> {
        self.poller.await_completion(job_id, &self.shutdown).await
    }

    /// Same as [`Dispatcher::await_completion`] with a caller-provided cancellation
    pub async fn await_completion_with(
        &self,
        job_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Job, DispatchError> {
        self.poller.await_completion(job_id, cancel).await
    }

    fn track(&self, job_id: Uuid) {
        let poller = self.poller.clone();
        let cancel = self.shutdown.child_token();
        tokio::spawn(async move {
            match poller.await_completion(job_id, &cancel).await {
                Ok(job) => info!(%job_id, status = %job.status, "Background polling finished"),
                Err(DispatchError::AlreadyPolling(_)) => {}
                Err(e) => warn!(%job_id, "Background polling failed: {}", e),
            }
        });
    }
}

fn enqueue_failure(err: &ClientError) -> String {
    match err {
        ClientError::ApiError { status, message } => {
            format!("Agent returned {}: {}", status, message)
        }
        other => format!("Failed to reach agent: {}", other),
    }
}
