//! Schema creation for the chunk index.
//!
//! ```text
//! documents (path, checksum) ──< chunks (path, checksum, chunk_index)
//! ```
//!
//! A `documents` row exists for every `(path, checksum)` that has received
//! at least one upload call, including documents with no chunks. Both
//! statements are idempotent.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            path TEXT NOT NULL,
            checksum INTEGER NOT NULL,
            ingested_at INTEGER NOT NULL,
            PRIMARY KEY (path, checksum)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            checksum INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            UNIQUE(path, checksum, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_owner ON chunks(path, checksum)")
        .execute(pool)
        .await?;

    Ok(())
}
