use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/classmate-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

pub async fn connect(config: &DbConfig) -> Result<PgPool> {
    debug!(url = %config.redacted_url(), "connecting to schedule store");
    options(MAX_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", config.redacted_url()))
}

/// Bring the schema up to date. Already-applied migrations are skipped.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to migrate schedule store")?;
    info!(migrations = MIGRATOR.iter().count(), "schedule store schema up to date");
    Ok(())
}

/// Create the configured database through the server's admin database.
///
/// Returns `true` when the database was created and `false` when it was
/// already there.
pub async fn create_database_if_missing(config: &DbConfig) -> Result<bool> {
    let Some(name) = config.database_name() else {
        bail!(
            "{} does not name a database that can be created \
             (use lowercase letters, digits and underscores)",
            config.redacted_url()
        );
    };

    let admin = DbConfig::new(config.admin_url());
    let admin_pool = options(1)
        .connect(&admin.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", admin.redacted_url()))?;

    let present: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&admin_pool)
            .await
            .context("failed to look up database")?;

    let created = if present {
        false
    } else {
        // database_name() only yields plain identifiers.
        admin_pool
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .with_context(|| format!("failed to create database {name}"))?;
        info!(db = name, "database created");
        true
    };

    admin_pool.close().await;
    Ok(created)
}
