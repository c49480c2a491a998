use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create organizations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            domain VARCHAR(255),
            status VARCHAR(20) NOT NULL DEFAULT 'active',
            agent_config JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One role per user; the role row is what ties a user to an organization
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_roles (
            user_id UUID PRIMARY KEY,
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            role VARCHAR(20) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id UUID PRIMARY KEY,
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            email VARCHAR(320) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create reports (jobs) table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id UUID PRIMARY KEY,
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            created_by UUID,
            name VARCHAR(255) NOT NULL,
            template VARCHAR(255) NOT NULL,
            instructions TEXT,
            data_sources TEXT[] NOT NULL DEFAULT '{}',
            status VARCHAR(20) NOT NULL,
            submitted_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            execution_time_ms BIGINT,
            result JSONB,
            error_message TEXT,
            thread_id VARCHAR(255),
            run_id VARCHAR(255)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedules (
            id UUID PRIMARY KEY,
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            created_by UUID,
            name VARCHAR(255) NOT NULL,
            template VARCHAR(255) NOT NULL,
            instructions TEXT,
            data_sources TEXT[] NOT NULL DEFAULT '{}',
            recurrence VARCHAR(20) NOT NULL,
            next_run_at TIMESTAMPTZ NOT NULL,
            timezone VARCHAR(64) NOT NULL DEFAULT 'UTC',
            output_formats TEXT[] NOT NULL DEFAULT '{}',
            recipients TEXT[] NOT NULL DEFAULT '{}',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id UUID PRIMARY KEY,
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            user_id UUID,
            action VARCHAR(64) NOT NULL,
            resource_type VARCHAR(64) NOT NULL,
            resource_id VARCHAR(255),
            details JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_org_submitted ON reports(organization_id, submitted_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_schedules_org ON schedules(organization_id, next_run_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_audit_logs_org ON audit_logs(organization_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
