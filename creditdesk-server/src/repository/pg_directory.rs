//! Postgres-backed directory store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use creditdesk_core::domain::audit::AuditEntry;
use creditdesk_core::domain::organization::{
    AppRole, Organization, OrganizationStatus, Profile, UserRole,
};
use creditdesk_core::domain::schedule::{Recurrence, Schedule};
use sqlx::PgPool;
use uuid::Uuid;

use super::directory::{DirectoryError, DirectoryStore};

#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn create_organization(&self, organization: &Organization) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, domain, status, agent_config, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(organization.id)
        .bind(&organization.name)
        .bind(&organization.domain)
        .bind(organization.status.as_str())
        .bind(&organization.agent_config)
        .bind(organization.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, format!("organization {}", organization.id)))?;

        Ok(())
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DirectoryError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, domain, status, agent_config, created_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), DirectoryError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound(format!("organization {}", id)));
        }
        Ok(())
    }

    async fn insert_role(&self, role: &UserRole) -> Result<(), DirectoryError> {
        sqlx::query("INSERT INTO user_roles (user_id, organization_id, role) VALUES ($1, $2, $3)")
            .bind(role.user_id)
            .bind(role.organization_id)
            .bind(role.role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, format!("role for user {}", role.user_id)))?;

        Ok(())
    }

    async fn role_for_user(&self, user_id: Uuid) -> Result<Option<UserRole>, DirectoryError> {
        let row: Option<(Uuid, Uuid, String)> = sqlx::query_as(
            "SELECT user_id, organization_id, role FROM user_roles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some((user_id, organization_id, role)) = row else {
            return Ok(None);
        };
        let role = AppRole::parse(&role).unwrap_or_else(|| {
            tracing::warn!(%user_id, "Unknown role '{}', treating as viewer", role);
            AppRole::Viewer
        });

        Ok(Some(UserRole {
            user_id,
            organization_id,
            role,
        }))
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), DirectoryError> {
        sqlx::query("INSERT INTO profiles (user_id, organization_id, email) VALUES ($1, $2, $3)")
            .bind(profile.user_id)
            .bind(profile.organization_id)
            .bind(&profile.email)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, format!("profile for user {}", profile.user_id)))?;

        Ok(())
    }

    async fn create_schedule(&self, schedule: &Schedule) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            INSERT INTO schedules (id, organization_id, created_by, name, template, instructions,
                                   data_sources, recurrence, next_run_at, timezone,
                                   output_formats, recipients, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.organization_id)
        .bind(schedule.created_by)
        .bind(&schedule.name)
        .bind(&schedule.template)
        .bind(&schedule.instructions)
        .bind(&schedule.data_sources)
        .bind(schedule.recurrence.as_str())
        .bind(schedule.next_run_at)
        .bind(&schedule.timezone)
        .bind(&schedule.output_formats)
        .bind(&schedule.recipients)
        .bind(schedule.is_active)
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, format!("schedule {}", schedule.id)))?;

        Ok(())
    }

    async fn list_schedules(&self, organization_id: Uuid) -> Result<Vec<Schedule>, DirectoryError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            r#"
            SELECT id, organization_id, created_by, name, template, instructions, data_sources,
                   recurrence, next_run_at, timezone, output_formats, recipients, is_active,
                   created_at
            FROM schedules
            WHERE organization_id = $1
            ORDER BY next_run_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, organization_id, user_id, action, resource_type,
                                    resource_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.organization_id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

fn backend(err: sqlx::Error) -> DirectoryError {
    tracing::error!("Directory store error: {:?}", err);
    DirectoryError::Backend(err.to_string())
}

/// Unique and foreign key violations become typed errors
fn classify(err: sqlx::Error, what: String) -> DirectoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DirectoryError::Conflict(what);
        }
        if db.is_foreign_key_violation() {
            return DirectoryError::NotFound(what);
        }
    }
    backend(err)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    domain: Option<String>,
    status: String,
    agent_config: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            domain: row.domain,
            status: OrganizationStatus::parse(&row.status),
            agent_config: row.agent_config,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    organization_id: Uuid,
    created_by: Option<Uuid>,
    name: String,
    template: String,
    instructions: Option<String>,
    data_sources: Vec<String>,
    recurrence: String,
    next_run_at: DateTime<Utc>,
    timezone: String,
    output_formats: Vec<String>,
    recipients: Vec<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        let recurrence = Recurrence::parse(&row.recurrence).unwrap_or_else(|| {
            tracing::warn!(schedule_id = %row.id, "Unknown recurrence '{}'", row.recurrence);
            Recurrence::Custom
        });

        Schedule {
            id: row.id,
            organization_id: row.organization_id,
            created_by: row.created_by,
            name: row.name,
            template: row.template,
            instructions: row.instructions,
            data_sources: row.data_sources,
            recurrence,
            next_run_at: row.next_run_at,
            timezone: row.timezone,
            output_formats: row.output_formats,
            recipients: row.recipients,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}
