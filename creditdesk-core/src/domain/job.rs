//! Job domain types
//!
//! A job is one report-generation request handed to the external compute
//! agent and tracked until it reaches a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Job record
///
/// Structure shared between the server (persists), the dispatcher (updates)
/// and the CLI (displays). `external_ref` is only meaningful to the poller
/// and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Option<Uuid>,
    pub name: String,
    pub template: String,
    pub instructions: Option<String>,
    pub data_sources: Vec<String>,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub execution_time_ms: Option<i64>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    #[serde(skip)]
    pub external_ref: Option<ExternalRef>,
}

/// Job status
///
/// Transitions are one-directional: Pending -> Processing -> {Completed, Failed},
/// plus Pending -> Failed when the agent refuses the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job in `self` may move to `next`
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle assigned by the external agent (a thread/run pair)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRef {
    pub thread_id: String,
    pub run_id: String,
}

impl std::fmt::Display for ExternalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.thread_id, self.run_id)
    }
}

/// What the caller asks the agent to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<String>,
}

impl JobSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Report name is required".to_string());
        }
        if self.template.trim().is_empty() {
            return Err("Template is required".to_string());
        }
        Ok(())
    }

    /// Renders the spec as the single user message sent to the agent
    pub fn prompt(&self) -> String {
        let mut prompt = format!("Report: {}\nTemplate: {}", self.name, self.template);
        if let Some(instructions) = self.instructions.as_deref().filter(|s| !s.trim().is_empty()) {
            prompt.push_str("\nInstructions: ");
            prompt.push_str(instructions.trim());
        }
        if !self.data_sources.is_empty() {
            prompt.push_str("\nData sources: ");
            prompt.push_str(&self.data_sources.join(", "));
        }
        prompt
    }
}

/// A single state change applied to a job record
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// The agent accepted the job
    Dispatched { external_ref: ExternalRef },
    Completed {
        result: serde_json::Value,
        completed_at: DateTime<Utc>,
    },
    Failed {
        error_message: String,
        completed_at: DateTime<Utc>,
    },
}

impl JobUpdate {
    pub fn completed(result: serde_json::Value) -> Self {
        JobUpdate::Completed {
            result,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        JobUpdate::Failed {
            error_message: error_message.into(),
            completed_at: Utc::now(),
        }
    }

    pub fn target_status(&self) -> JobStatus {
        match self {
            JobUpdate::Dispatched { .. } => JobStatus::Processing,
            JobUpdate::Completed { .. } => JobStatus::Completed,
            JobUpdate::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid job transition from {from} to {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl Job {
    /// Creates a new Pending job
    pub fn new(spec: JobSpec, organization_id: Uuid, created_by: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            created_by,
            name: spec.name,
            template: spec.template,
            instructions: spec.instructions,
            data_sources: spec.data_sources,
            status: JobStatus::Pending,
            submitted_at: Utc::now(),
            completed_at: None,
            execution_time_ms: None,
            result: None,
            error_message: None,
            external_ref: None,
        }
    }

    /// Applies an update, refusing anything that breaks the lifecycle
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), TransitionError> {
        let to = update.target_status();
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }

        match update {
            JobUpdate::Dispatched { external_ref } => {
                self.external_ref = Some(external_ref);
            }
            JobUpdate::Completed {
                result,
                completed_at,
            } => {
                self.finish(completed_at);
                self.result = Some(result);
            }
            JobUpdate::Failed {
                error_message,
                completed_at,
            } => {
                self.finish(completed_at);
                self.error_message = Some(error_message);
            }
        }
        self.status = to;
        Ok(())
    }

    /// Clamped so that completed_at is never before submitted_at
    pub fn clamp_completed_at(&self, completed_at: DateTime<Utc>) -> DateTime<Utc> {
        completed_at.max(self.submitted_at)
    }

    fn finish(&mut self, completed_at: DateTime<Utc>) {
        let completed_at = self.clamp_completed_at(completed_at);
        self.completed_at = Some(completed_at);
        self.execution_time_ms = Some((completed_at - self.submitted_at).num_milliseconds());
    }
}
