//! Rota duty-schedule service.
//!
//! Main entry point: initializes logging, loads configuration, prepares the
//! optional Postgres store, and serves the API until shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use rota_api::{AppState, Config};
use rota_core::{PgScheduleStore, RealClock, ScheduleStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting rota duty-schedule service");

    let config = Config::load()?;
    info!(
        database_url = %config.database_url_masked(),
        allowed_email_domain = config.allowed_email_domain().unwrap_or("<any>"),
        host = %config.host,
        port = config.port,
        "Configuration loaded"
    );

    let addr = config.parse_server_addr()?;

    // Boot without a store when DATABASE_URL is absent: the gate and
    // validation still run, submissions get the configuration error.
    let mut pool = None;
    let store: Option<Arc<dyn ScheduleStore>> = match config.database_url() {
        Some(url) => {
            let db = create_database_pool(url, config.database_max_connections).await?;
            run_migrations(&db).await?;
            info!("Database ready");

            pool = Some(db.clone());
            Some(Arc::new(PgScheduleStore::new(db)))
        },
        None => {
            warn!("DATABASE_URL not set; submissions will be rejected until it is configured");
            None
        },
    };

    let state = AppState::new(
        store,
        config.allowed_email_domain().map(str::to_owned),
        Arc::new(RealClock::new()),
    );

    rota_api::start_server(state, addr).await.context("Server failed")?;

    if let Some(pool) = pool {
        pool.close().await;
        info!("Database connections closed");
    }

    info!("Rota shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,rota=debug,tower_http=debug"))
        .expect("Invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(url: &str, max_connections: u32) -> Result<sqlx::PgPool> {
    let mut retries = 0;
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    loop {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .fetch_one(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(_e) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    "Database connection failed, retrying..."
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}

/// Ensures the schedule table exists.
async fn run_migrations(pool: &sqlx::PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule_entries (
            id TEXT PRIMARY KEY,
            partition_key TEXT NOT NULL,
            duties_json TEXT NOT NULL,
            saved_by TEXT NOT NULL,
            saved_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create schedule_entries table")?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_schedule_entries_partition
        ON schedule_entries(partition_key, saved_at DESC)
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create schedule_entries partition index")?;

    Ok(())
}
