//! Job DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobSpec;

/// Request to submit a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJob {
    /// Must match the caller's organization when present
    #[serde(default)]
    pub organization_id: Option<Uuid>,

    #[serde(flatten)]
    pub spec: JobSpec,
}

/// Query parameters for job submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Await completion inline instead of polling in the background
    #[serde(default)]
    pub wait: bool,
}

/// Query parameters for job analytics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    /// Window in days, today included (default: 7)
    #[serde(default)]
    pub days: Option<u32>,
}

impl AnalyticsQuery {
    pub const DEFAULT_DAYS: u32 = 7;
    pub const MAX_DAYS: u32 = 90;

    pub fn window(&self) -> u32 {
        self.days
            .unwrap_or(Self::DEFAULT_DAYS)
            .clamp(1, Self::MAX_DAYS)
    }
}
