use anyhow::Context;
use creditdesk_client::{HttpAgentClient, HttpIdentityProvider};
use creditdesk_dispatcher::{InMemoryJobStore, JobStore};
use creditdesk_server::config::ServerConfig;
use creditdesk_server::repository::{
    DirectoryStore, InMemoryDirectoryStore, PgDirectoryStore, PgJobStore,
};
use creditdesk_server::{AppState, create_router, db, shutdown};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "creditdesk_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CreditDesk server...");

    let config = ServerConfig::from_env().context("Invalid configuration")?;

    let (jobs, directory): (Arc<dyn JobStore>, Arc<dyn DirectoryStore>) =
        match &config.database_url {
            Some(database_url) => {
                tracing::info!("Connecting to database...");

                let pool = db::create_pool(database_url)
                    .await
                    .context("Failed to create database pool")?;

                tracing::info!("Database connection pool created");

                db::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;

                let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool.clone()));
                let directory: Arc<dyn DirectoryStore> = Arc::new(PgDirectoryStore::new(pool));
                (jobs, directory)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, records are kept in memory only");
                let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
                let directory: Arc<dyn DirectoryStore> = Arc::new(InMemoryDirectoryStore::new());
                (jobs, directory)
            }
        };

    if config.agent.agent_id.is_none() {
        tracing::info!("AGENT_ID not set, using chat completions instead of runs");
    }

    let shutdown = shutdown::install_shutdown_handler()
        .context("Failed to install signal handlers")?;

    let state = AppState::new(
        jobs,
        directory,
        Arc::new(HttpAgentClient::new(config.agent.clone())),
        Arc::new(HttpIdentityProvider::new(config.identity.clone())),
        config.poll,
        shutdown.clone(),
    );

    // Build router with all API endpoints
    let app = create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}
