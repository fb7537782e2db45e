//! Storage contracts for docwatch.
//!
//! Two layers sit between the registry and a backend:
//!
//! | Trait | Granularity | Implemented by |
//! |-------|-------------|----------------|
//! | [`Store`] | whole documents | [`IngestPipeline`](crate::pipeline::IngestPipeline) |
//! | [`ChunkSink`] | buckets of tagged chunks | backends (in-memory, SQLite) |
//!
//! The registry only ever talks to a [`Store`]. A backend only has to
//! know how to add a bucket of chunks tagged with their owning
//! `(path, checksum)`, delete every chunk carrying a tag, and list the
//! distinct tags it holds.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, StoreDocument};

/// Document-level view of the remote index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ingest`](Store::ingest) | Upload all chunks of a document |
/// | [`forget`](Store::forget) | Delete every chunk of a `(path, checksum)` pair |
/// | [`get_ingested`](Store::get_ingested) | List the distinct pairs currently indexed |
#[async_trait]
pub trait Store: Send + Sync {
    /// Upload a document. On failure no fragment of it may stay indexed.
    async fn ingest(&self, doc: &Document) -> Result<()>;

    /// Remove a document version from the index.
    async fn forget(&self, doc: &StoreDocument) -> Result<()>;

    /// Snapshot of every document version in the index.
    async fn get_ingested(&self) -> Result<Vec<StoreDocument>>;
}

/// Chunk-level backend contract used by the ingestion pipeline.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Add one bucket of chunks, each tagged with `owner`.
    ///
    /// `first_index` is the position of `chunks[0]` within the document.
    /// A bucket may be empty; the owner must still be reported by
    /// [`owners`](ChunkSink::owners) afterwards.
    async fn add(&self, owner: &StoreDocument, first_index: usize, chunks: &[String])
        -> Result<()>;

    /// Delete every chunk tagged with `owner`. Deleting nothing is not an error.
    async fn delete(&self, owner: &StoreDocument) -> Result<()>;

    /// Distinct owner tags present in the backend.
    async fn owners(&self) -> Result<Vec<StoreDocument>>;
}
