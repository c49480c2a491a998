//! Schedule DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::schedule::Recurrence;

/// Request to schedule a recurring report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSchedule {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<String>,
    pub recurrence: Recurrence,
    pub next_run_at: DateTime<Utc>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub output_formats: Vec<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl CreateSchedule {
    /// Checks required fields; `now` is the reference for "not in the past"
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.name.trim().is_empty() || self.template.trim().is_empty() {
            return Err("Please fill in all required fields".to_string());
        }
        // one minute of slack for clock skew between caller and server
        if self.next_run_at < now - chrono::Duration::minutes(1) {
            return Err("next_run_at must not be in the past".to_string());
        }
        if self.recipients.iter().any(|r| !r.contains('@')) {
            return Err("recipients must be e-mail addresses".to_string());
        }
        Ok(())
    }
}
