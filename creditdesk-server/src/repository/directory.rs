//! Directory Repository
//!
//! Organizations, memberships, profiles, schedules and the audit trail.

use async_trait::async_trait;
use creditdesk_core::domain::audit::AuditEntry;
use creditdesk_core::domain::organization::{Organization, Profile, UserRole};
use creditdesk_core::domain::schedule::Schedule;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("directory store error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn create_organization(&self, organization: &Organization) -> Result<(), DirectoryError>;

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DirectoryError>;

    async fn delete_organization(&self, id: Uuid) -> Result<(), DirectoryError>;

    async fn insert_role(&self, role: &UserRole) -> Result<(), DirectoryError>;

    /// The membership of a user; a user belongs to at most one organization
    async fn role_for_user(&self, user_id: Uuid) -> Result<Option<UserRole>, DirectoryError>;

    async fn insert_profile(&self, profile: &Profile) -> Result<(), DirectoryError>;

    async fn create_schedule(&self, schedule: &Schedule) -> Result<(), DirectoryError>;

    /// Schedules of one organization, next run first
    async fn list_schedules(&self, organization_id: Uuid) -> Result<Vec<Schedule>, DirectoryError>;

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), DirectoryError>;
}

#[derive(Debug, Default)]
struct Directory {
    organizations: HashMap<Uuid, Organization>,
    roles: HashMap<Uuid, UserRole>,
    profiles: HashMap<Uuid, Profile>,
    schedules: Vec<Schedule>,
    audit: Vec<AuditEntry>,
}

/// Directory kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    inner: RwLock<Directory>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit entries of one organization, oldest first
    pub async fn audit_entries(&self, organization_id: Uuid) -> Vec<AuditEntry> {
        self.inner
            .read()
            .await
            .audit
            .iter()
            .filter(|entry| entry.organization_id == organization_id)
            .cloned()
            .collect()
    }

    pub async fn organization_count(&self) -> usize {
        self.inner.read().await.organizations.len()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn create_organization(&self, organization: &Organization) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if inner.organizations.contains_key(&organization.id) {
            return Err(DirectoryError::Conflict(format!(
                "organization {}",
                organization.id
            )));
        }
        inner
            .organizations
            .insert(organization.id, organization.clone());
        Ok(())
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DirectoryError> {
        Ok(self.inner.read().await.organizations.get(&id).cloned())
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if inner.organizations.remove(&id).is_none() {
            return Err(DirectoryError::NotFound(format!("organization {}", id)));
        }
        // Same cascade as the foreign keys in Postgres
        inner.roles.retain(|_, role| role.organization_id != id);
        inner.profiles.retain(|_, profile| profile.organization_id != id);
        inner.schedules.retain(|schedule| schedule.organization_id != id);
        inner.audit.retain(|entry| entry.organization_id != id);
        Ok(())
    }

    async fn insert_role(&self, role: &UserRole) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if !inner.organizations.contains_key(&role.organization_id) {
            return Err(DirectoryError::NotFound(format!(
                "organization {}",
                role.organization_id
            )));
        }
        if inner.roles.contains_key(&role.user_id) {
            return Err(DirectoryError::Conflict(format!("role for user {}", role.user_id)));
        }
        inner.roles.insert(role.user_id, role.clone());
        Ok(())
    }

    async fn role_for_user(&self, user_id: Uuid) -> Result<Option<UserRole>, DirectoryError> {
        Ok(self.inner.read().await.roles.get(&user_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if inner.profiles.contains_key(&profile.user_id) {
            return Err(DirectoryError::Conflict(format!(
                "profile for user {}",
                profile.user_id
            )));
        }
        inner.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn create_schedule(&self, schedule: &Schedule) -> Result<(), DirectoryError> {
        self.inner.write().await.schedules.push(schedule.clone());
        Ok(())
    }

    async fn list_schedules(&self, organization_id: Uuid) -> Result<Vec<Schedule>, DirectoryError> {
        let mut schedules: Vec<Schedule> = self
            .inner
            .read()
            .await
            .schedules
            .iter()
            .filter(|s| s.organization_id == organization_id)
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.next_run_at.cmp(&b.next_run_at));
        Ok(schedules)
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), DirectoryError> {
        self.inner.write().await.audit.push(entry.clone());
        Ok(())
    }
}
