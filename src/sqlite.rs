//! SQLite-backed [`ChunkSink`].
//!
//! Every chunk row carries the `(path, checksum)` of the document it came
//! from, so one version of a document can be located and deleted as a
//! unit. A `documents` row records each version that received an upload
//! call; [`owners`](ChunkSink::owners) reads that table so documents with
//! no chunks are still reported as ingested.
//!
//! Each [`add`](ChunkSink::add) and [`delete`](ChunkSink::delete) runs in
//! its own transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::migrate;
use docwatch_core::models::StoreDocument;
use docwatch_core::store::ChunkSink;

/// One indexed document version with its chunk count.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedDocument {
    pub path: String,
    pub checksum: u32,
    pub chunks: i64,
    pub ingested_at: DateTime<Utc>,
}

pub struct SqliteCollection {
    pool: SqlitePool,
}

impl SqliteCollection {
    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool)
            .await
            .context("Failed to prepare index schema")?;
        Ok(Self { pool })
    }

    /// Drop every chunk and document record. Returns the number of
    /// document versions removed.
    pub async fn reset(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        let removed = sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed)
    }

    /// Every indexed document version, ordered by path.
    pub async fn status(&self) -> Result<Vec<IndexedDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT d.path AS path, d.checksum AS checksum, d.ingested_at AS ingested_at,
                   COUNT(c.id) AS chunk_count
            FROM documents d
            LEFT JOIN chunks c ON c.path = d.path AND c.checksum = d.checksum
            GROUP BY d.path, d.checksum
            ORDER BY d.path, d.checksum
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let ts: i64 = row.get("ingested_at");
                Ok(IndexedDocument {
                    path: row.get("path"),
                    checksum: checksum_from_db(row.get("checksum"))?,
                    chunks: row.get("chunk_count"),
                    ingested_at: DateTime::from_timestamp(ts, 0).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Stored chunk texts of one document version, in document order.
    pub async fn texts(&self, owner: &StoreDocument) -> Result<Vec<String>> {
        let texts = sqlx::query_scalar(
            "SELECT text FROM chunks WHERE path = ? AND checksum = ? ORDER BY chunk_index",
        )
        .bind(&owner.path)
        .bind(i64::from(owner.checksum))
        .fetch_all(&self.pool)
        .await?;
        Ok(texts)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn checksum_from_db(value: i64) -> Result<u32> {
    u32::try_from(value).with_context(|| format!("Corrupt checksum in index: {}", value))
}

#[async_trait]
impl ChunkSink for SqliteCollection {
    async fn add(
        &self,
        owner: &StoreDocument,
        first_index: usize,
        chunks: &[String],
    ) -> Result<()> {
        let checksum = i64::from(owner.checksum);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (path, checksum, ingested_at) VALUES (?, ?, ?)
            ON CONFLICT(path, checksum) DO UPDATE SET ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&owner.path)
        .bind(checksum)
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        for (offset, text) in chunks.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, path, checksum, chunk_index, text) VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(path, checksum, chunk_index) DO UPDATE SET text = excluded.text
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&owner.path)
            .bind(checksum)
            .bind((first_index + offset) as i64)
            .bind(text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, owner: &StoreDocument) -> Result<()> {
        let checksum = i64::from(owner.checksum);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE path = ? AND checksum = ?")
            .bind(&owner.path)
            .bind(checksum)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE path = ? AND checksum = ?")
            .bind(&owner.path)
            .bind(checksum)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn owners(&self) -> Result<Vec<StoreDocument>> {
        let rows = sqlx::query("SELECT path, checksum FROM documents ORDER BY path, checksum")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(StoreDocument::new(
                    row.get::<String, _>("path"),
                    checksum_from_db(row.get("checksum"))?,
                ))
            })
            .collect()
    }
}
