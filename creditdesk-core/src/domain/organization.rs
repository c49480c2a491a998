//! Organization domain model
//!
//! Organizations own jobs and schedules. Users are attached to exactly one
//! organization through a role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,

    /// Mail domain of the organization, e.g. "acme.com"
    pub domain: Option<String>,

    pub status: OrganizationStatus,

    /// Per-organization agent connection settings, forwarded to the agent as context
    pub agent_config: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Active,
    Suspended,
}

impl OrganizationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrganizationStatus::Active => "active",
            OrganizationStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> OrganizationStatus {
        match s {
            "suspended" => OrganizationStatus::Suspended,
            _ => OrganizationStatus::Active,
        }
    }
}

impl Organization {
    /// Creates an active organization whose domain is taken from a contact e-mail
    pub fn new(name: impl Into<String>, contact_email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            domain: email_domain(contact_email),
            status: OrganizationStatus::Active,
            agent_config: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }
}

/// Returns the part after the last '@', if any
pub fn email_domain(email: &str) -> Option<String> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim().to_lowercase())
        .filter(|domain| !domain.is_empty())
}

/// Role of a user inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    Admin,
    ItAdmin,
    Scheduler,
    Viewer,
}

impl AppRole {
    /// Whether this role may submit jobs and create schedules
    pub fn can_submit(self) -> bool {
        !matches!(self, AppRole::Viewer)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::ItAdmin => "it_admin",
            AppRole::Scheduler => "scheduler",
            AppRole::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<AppRole> {
        match s {
            "admin" => Some(AppRole::Admin),
            "it_admin" => Some(AppRole::ItAdmin),
            "scheduler" => Some(AppRole::Scheduler),
            "viewer" => Some(AppRole::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership of a user in an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: AppRole,
}

/// User profile inside an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
}
