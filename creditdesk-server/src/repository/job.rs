//! Job Repository
//!
//! Postgres-backed job store. Jobs live in the `reports` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use creditdesk_core::domain::job::{ExternalRef, Job, JobStatus, JobUpdate, TransitionError};
use creditdesk_dispatcher::{JobStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

const JOB_COLUMNS: &str = r#"
    id, organization_id, created_by, name, template, instructions, data_sources,
    status, submitted_at, completed_at, execution_time_ms, result, error_message,
    thread_id, run_id
"#;

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, organization_id, created_by, name, template, instructions,
                                 data_sources, status, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(job.id)
        .bind(job.organization_id)
        .bind(job.created_by)
        .bind(&job.name)
        .bind(&job.template)
        .bind(&job.instructions)
        .bind(&job.data_sources)
        .bind(job.status.as_str())
        .bind(job.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    /// One conditional UPDATE: the row only changes if its current status
    /// may move to the target status.
    async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let to = update.target_status();
        let allowed_from: Vec<String> = [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ]
        .into_iter()
        .filter(|from| from.can_transition_to(to))
        .map(|from| from.as_str().to_string())
        .collect();

        let mut fields = UpdateFields::default();
        match update {
            JobUpdate::Dispatched { external_ref } => {
                fields.thread_id = Some(external_ref.thread_id);
                fields.run_id = Some(external_ref.run_id);
            }
            JobUpdate::Completed {
                result,
                completed_at,
            } => {
                fields.result = Some(result);
                fields.completed_at = Some(completed_at);
            }
            JobUpdate::Failed {
                error_message,
                completed_at,
            } => {
                fields.error_message = Some(error_message);
                fields.completed_at = Some(completed_at);
            }
        }

        let query = format!(
            r#"
            UPDATE reports SET
                status = $2,
                thread_id = COALESCE($3, thread_id),
                run_id = COALESCE($4, run_id),
                result = COALESCE($5, result),
                error_message = COALESCE($6, error_message),
                completed_at = CASE WHEN $7::timestamptz IS NULL THEN completed_at
                                    ELSE GREATEST($7::timestamptz, submitted_at) END,
                execution_time_ms = CASE WHEN $7::timestamptz IS NULL THEN execution_time_ms
                                    ELSE FLOOR(EXTRACT(EPOCH FROM (GREATEST($7::timestamptz, submitted_at) - submitted_at)) * 1000)::BIGINT END
            WHERE id = $1 AND status = ANY($8)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(fields.thread_id)
            .bind(fields.run_id)
            .bind(fields.result)
            .bind(fields.error_message)
            .bind(fields.completed_at)
            .bind(&allowed_from)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => Ok(row.into()),
            None => match self.get(id).await? {
                Some(current) => Err(StoreError::InvalidTransition(TransitionError {
                    from: current.status,
                    to,
                })),
                None => Err(StoreError::NotFound(id)),
            },
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let query = format!("SELECT {} FROM reports WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<Job>, StoreError> {
        let query = format!(
            "SELECT {} FROM reports WHERE organization_id = $1 ORDER BY submitted_at DESC",
            JOB_COLUMNS
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!("Job store error: {:?}", err);
    StoreError::Backend(err.to_string())
}

#[derive(Default)]
struct UpdateFields {
    thread_id: Option<String>,
    run_id: Option<String>,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    organization_id: Uuid,
    created_by: Option<Uuid>,
    name: String,
    template: String,
    instructions: Option<String>,
    data_sources: Vec<String>,
    status: String,
    submitted_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    execution_time_ms: Option<i64>,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    thread_id: Option<String>,
    run_id: Option<String>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        let status = JobStatus::parse(&row.status).unwrap_or_else(|| {
            tracing::warn!(job_id = %row.id, "Unknown job status '{}', treating as failed", row.status);
            JobStatus::Failed
        });

        let external_ref = match (row.thread_id, row.run_id) {
            (Some(thread_id), Some(run_id)) => Some(ExternalRef { thread_id, run_id }),
            _ => None,
        };

        Job {
            id: row.id,
            organization_id: row.organization_id,
            created_by: row.created_by,
            name: row.name,
            template: row.template,
            instructions: row.instructions,
            data_sources: row.data_sources,
            status,
            submitted_at: row.submitted_at,
            completed_at: row.completed_at,
            execution_time_ms: row.execution_time_ms,
            result: row.result,
            error_message: row.error_message,
            external_ref,
        }
    }
}
