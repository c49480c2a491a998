//! Schedule domain model
//!
//! A schedule describes a report that should be generated on a recurrence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Option<Uuid>,
    pub name: String,
    pub template: String,
    pub instructions: Option<String>,
    pub data_sources: Vec<String>,
    pub recurrence: Recurrence,
    pub next_run_at: DateTime<Utc>,
    pub timezone: String,
    pub output_formats: Vec<String>,
    pub recipients: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::OneTime => "one_time",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Recurrence> {
        match s {
            "one_time" => Some(Recurrence::OneTime),
            "daily" => Some(Recurrence::Daily),
            "weekly" => Some(Recurrence::Weekly),
            "monthly" => Some(Recurrence::Monthly),
            "custom" => Some(Recurrence::Custom),
            _ => None,
        }
    }
}
