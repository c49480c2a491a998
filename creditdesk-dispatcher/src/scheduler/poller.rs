//! Job poller
//!
//! Drives a dispatched job to a terminal state by querying the agent for
//! the status of its run. Each job is polled by at most one task at a
//! time; the loop sleeps between queries and never blocks a thread.

use creditdesk_client::{AgentClient, ClientError, RemoteState};
use creditdesk_core::domain::job::{ExternalRef, Job, JobStatus, JobUpdate};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PollConfig;
use crate::error::DispatchError;
use crate::repository::{JobStore, StoreError};

pub const TIMEOUT_MESSAGE: &str = "timed out waiting for completion";
pub const MISSING_RESULT_MESSAGE: &str = "remote job succeeded without a result";

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(Value),
    Failed(String),
    /// Stopped locally; the remote run was left alone
    Cancelled,
}

/// Queries `external_ref` until it reaches a terminal state
///
/// Every query counts toward `config.max_attempts`, including failed ones.
pub async fn poll_until_terminal(
    agent: &dyn AgentClient,
    external_ref: &ExternalRef,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> PollOutcome {
    let mut transport_errors = 0;

    for attempt in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        let delay = match agent.get_status(external_ref).await {
            Ok(status) => match status.state {
                RemoteState::Succeeded => {
                    return match status.result {
                        Some(result) => PollOutcome::Succeeded(result),
                        None => PollOutcome::Failed(MISSING_RESULT_MESSAGE.to_string()),
                    };
                }
                RemoteState::Failed | RemoteState::Cancelled | RemoteState::Expired => {
                    let detail = status
                        .error_detail
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| {
                            format!("remote job {} without error detail", status.state)
                        });
                    return PollOutcome::Failed(detail);
                }
                RemoteState::Queued | RemoteState::Running => {
                    debug!(run = %external_ref, attempt, state = %status.state, "Run still in progress");
                    config.interval
                }
            },
            Err(e) => {
                if !retryable(&e) || transport_errors >= config.retry.max_transport_retries {
                    return PollOutcome::Failed(format!("status check failed: {}", e));
                }
                transport_errors += 1;
                warn!(run = %external_ref, attempt, "Status check failed, retrying: {}", e);
                config.retry.backoff(transport_errors)
            }
        };

        if attempt == config.max_attempts {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    PollOutcome::Failed(TIMEOUT_MESSAGE.to_string())
}

fn retryable(err: &ClientError) -> bool {
    err.is_transport()
}

/// Awaits jobs to completion and writes their outcome
#[derive(Clone)]
pub struct Poller {
    store: Arc<dyn JobStore>,
    agent: Arc<dyn AgentClient>,
    config: PollConfig,
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl Poller {
    pub fn new(store: Arc<dyn JobStore>, agent: Arc<dyn AgentClient>, config: PollConfig) -> Self {
        Self {
            store,
            agent,
            config,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Polls a Processing job until it is Completed or Failed
    ///
    /// Terminal jobs are returned unchanged. When `cancel` fires the loop
    /// stops without writing and the job is returned as stored.
    pub async fn await_completion(
        &self,
        job_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Job, DispatchError> {
        let job = self.load(job_id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }
        if job.status == JobStatus::Pending {
            return Err(DispatchError::InvalidState {
                id: job_id,
                status: job.status,
            });
        }

        let _guard = PollGuard::acquire(&self.active, job_id)?;

        // Another poller may have finished the job before we got the guard
        let job = self.load(job_id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        let Some(external_ref) = job.external_ref.clone() else {
            warn!(%job_id, "Processing job has no external reference");
            return self
                .finish(job_id, JobUpdate::failed("status check failed: no external reference recorded"))
                .await;
        };

        info!(%job_id, run = %external_ref, "Polling job");
        match poll_until_terminal(self.agent.as_ref(), &external_ref, &self.config, cancel).await {
            PollOutcome::Succeeded(result) => {
                info!(%job_id, "Job completed");
                self.finish(job_id, JobUpdate::completed(result)).await
            }
            PollOutcome::Failed(message) => {
                warn!(%job_id, "Job failed: {}", message);
                self.finish(job_id, JobUpdate::failed(message)).await
            }
            PollOutcome::Cancelled => {
                info!(%job_id, "Polling cancelled");
                self.load(job_id).await
            }
        }
    }

    async fn load(&self, job_id: Uuid) -> Result<Job, DispatchError> {
        self.store
            .get(job_id)
            .await?
            .ok_or(DispatchError::NotFound(job_id))
    }

    /// Writes the terminal update; a job that is already terminal wins
    async fn finish(&self, job_id: Uuid, update: JobUpdate) -> Result<Job, DispatchError> {
        match self.store.update(job_id, update).await {
            Ok(job) => Ok(job),
            Err(StoreError::InvalidTransition(e)) => {
                debug!(%job_id, "Job already settled: {}", e);
                self.load(job_id).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Marks a job as being polled for as long as it lives
struct PollGuard {
    active: Arc<Mutex<HashSet<Uuid>>>,
    job_id: Uuid,
}

impl PollGuard {
    fn acquire(active: &Arc<Mutex<HashSet<Uuid>>>, job_id: Uuid) -> Result<Self, DispatchError> {
        let mut set = active.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(job_id) {
            return Err(DispatchError::AlreadyPolling(job_id));
        }
        Ok(Self {
            active: Arc::clone(active),
            job_id,
        })
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.job_id);
    }
}
