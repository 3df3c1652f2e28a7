//! Database access layer
//!
//! One table, `audios`, holding a reference row per successful upload.

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

pub mod audios;
pub mod pagination;

pub use audios::AudioRecord;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS audios (
        id BLOB PRIMARY KEY NOT NULL,
        audio_url TEXT NOT NULL,
        uploaded_at TEXT NOT NULL
    )",
];

/// Open the pool and make sure the schema exists.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .with_context(|| format!("Failed to connect to database at {}", config.url))?;

    init_schema(&pool).await?;
    info!(url = %config.url, "Database ready");
    Ok(pool)
}

/// Create tables and indexes. Safe to run on every start.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to initialize database schema")?;
    }
    Ok(())
}

/// Cheap round trip used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Single-connection in-memory pool for tests.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    // Every connection to :memory: is its own database, so cap the pool at one
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    init_schema(&pool).await.expect("schema");
    pool
}
