//! Bucketed document ingestion with rollback.
//!
//! [`IngestPipeline`] turns a [`ChunkSink`] into a [`Store`]. A document's
//! chunks are packed, in order, into buckets whose byte total stays
//! strictly below `request_size`; each bucket is one [`ChunkSink::add`]
//! call. If any call fails, every chunk already uploaded for the
//! document's `(path, checksum)` is deleted before the error is returned,
//! so a half-uploaded document never stays indexed.
//!
//! # Bucketing
//!
//! ```text
//! request_size = 13
//! chunks: "Bananas" "are" | "berries" "but" | "strawberries" | "aren't"
//! bytes:     7       3    |    7       3    |      12        |    6
//! ```
//!
//! A chunk that would bring the bucket to `request_size` or more closes
//! the current bucket and opens the next one. A chunk that alone reaches
//! the limit travels in a bucket of its own. The last bucket is always
//! sent, so a document with no chunks still produces one (empty) call.

use std::error::Error as StdError;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, StoreDocument};
use crate::store::{ChunkSink, Store};

/// A bucket upload failed.
///
/// Carries the original upload error and, when the compensating delete
/// also failed, the rollback error. The upload error is the
/// [`source`](std::error::Error::source).
#[derive(Debug)]
pub struct IngestError {
    pub document: StoreDocument,
    /// Zero-based index of the bucket that failed.
    pub bucket: usize,
    pub upload: anyhow::Error,
    /// `None` when the rollback succeeded.
    pub rollback: Option<anyhow::Error>,
}

impl IngestError {
    pub fn rolled_back(&self) -> bool {
        self.rollback.is_none()
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to ingest bucket {} of {} (crc {}): {:#}",
            self.bucket, self.document.path, self.document.checksum, self.upload
        )?;
        match &self.rollback {
            None => write!(f, "; partial upload rolled back"),
            Some(e) => write!(f, "; rollback failed: {:#}", e),
        }
    }
}

impl StdError for IngestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.upload)
    }
}

/// [`Store`] implementation that buckets uploads to a [`ChunkSink`].
pub struct IngestPipeline<S> {
    sink: S,
    request_size: usize,
}

impl<S: ChunkSink> IngestPipeline<S> {
    /// `request_size` is the exclusive upper bound, in bytes, of chunk text
    /// sent in one [`ChunkSink::add`] call.
    pub fn new(sink: S, request_size: usize) -> Self {
        Self { sink, request_size }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    async fn upload(
        &self,
        owner: &StoreDocument,
        bucket: usize,
        first_index: usize,
        chunks: &[String],
    ) -> std::result::Result<(), IngestError> {
        if let Err(upload) = self.sink.add(owner, first_index, chunks).await {
            let rollback = self.sink.delete(owner).await.err();
            return Err(IngestError {
                document: owner.clone(),
                bucket,
                upload,
                rollback,
            });
        }
        Ok(())
    }
}

/// Split `chunks` into index ranges whose byte totals stay below `limit`.
///
/// Always returns at least one range; for no chunks that range is empty.
pub fn bucket_ranges(chunks: &[String], limit: usize) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut size = 0;

    for (i, chunk) in chunks.iter().enumerate() {
        if i > start && size + chunk.len() >= limit {
            ranges.push(start..i);
            start = i;
            size = 0;
        }
        size += chunk.len();
    }
    ranges.push(start..chunks.len());

    ranges
}

#[async_trait]
impl<S: ChunkSink> Store for IngestPipeline<S> {
    async fn ingest(&self, doc: &Document) -> Result<()> {
        let owner = doc.key();
        for (bucket, range) in bucket_ranges(&doc.chunks, self.request_size)
            .into_iter()
            .enumerate()
        {
            let first = range.start;
            self.upload(&owner, bucket, first, &doc.chunks[range])
                .await?;
        }
        Ok(())
    }

    async fn forget(&self, doc: &StoreDocument) -> Result<()> {
        self.sink.delete(doc).await
    }

    async fn get_ingested(&self) -> Result<Vec<StoreDocument>> {
        self.sink.owners().await
    }
}
