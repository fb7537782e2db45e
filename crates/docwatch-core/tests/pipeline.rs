//! Integration tests for the bucketed ingestion pipeline.
//!
//! A recording sink wraps [`InMemoryCollection`] so tests can count
//! upload calls, inject failures on a chosen bucket, and observe the
//! rollback delete.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use docwatch_core::models::{Document, StoreDocument};
use docwatch_core::pipeline::{IngestError, IngestPipeline};
use docwatch_core::store::memory::InMemoryCollection;
use docwatch_core::store::{ChunkSink, Store};

// ─── Recording sink ─────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSink {
    inner: InMemoryCollection,
    adds: Mutex<Vec<Vec<String>>>,
    deletes: Mutex<Vec<StoreDocument>>,
    fail_on_add: Option<usize>,
    fail_delete: bool,
    add_calls: AtomicUsize,
}

impl RecordingSink {
    fn failing_on(bucket: usize) -> Self {
        Self {
            fail_on_add: Some(bucket),
            ..Default::default()
        }
    }

    fn adds(&self) -> Vec<Vec<String>> {
        self.adds.lock().unwrap().clone()
    }

    fn deletes(&self) -> Vec<StoreDocument> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChunkSink for RecordingSink {
    async fn add(&self, owner: &StoreDocument, first_index: usize, chunks: &[String]) -> Result<()> {
        let call = self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_add == Some(call) {
            bail!("injected failure on bucket {}", call);
        }
        self.adds.lock().unwrap().push(chunks.to_vec());
        self.inner.add(owner, first_index, chunks).await
    }

    async fn delete(&self, owner: &StoreDocument) -> Result<()> {
        self.deletes.lock().unwrap().push(owner.clone());
        if self.fail_delete {
            bail!("injected delete failure");
        }
        self.inner.delete(owner).await
    }

    async fn owners(&self) -> Result<Vec<StoreDocument>> {
        self.inner.owners().await
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn facts_doc() -> Document {
    Document {
        path: "facts.pdf".to_string(),
        checksum: 12345,
        chunks: ["Bananas", "are", "berries", "but", "strawberries", "aren't"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_bucket_when_under_limit() {
    let pipeline = IngestPipeline::new(RecordingSink::default(), 1024);
    let doc = Document {
        path: "facts.pdf".to_string(),
        checksum: 12345,
        chunks: vec!["Bananas are berries, but strawberries aren't.".to_string()],
    };

    pipeline.ingest(&doc).await.unwrap();

    assert_eq!(pipeline.sink().adds().len(), 1);
    assert_eq!(
        pipeline.get_ingested().await.unwrap(),
        vec![StoreDocument::new("facts.pdf", 12345)]
    );
}

#[tokio::test]
async fn test_large_document_split_into_buckets_under_limit() {
    let pipeline = IngestPipeline::new(RecordingSink::default(), 13);
    let doc = facts_doc();

    pipeline.ingest(&doc).await.unwrap();

    let adds = pipeline.sink().adds();
    assert_eq!(adds.len(), 4);
    for bucket in &adds {
        let bytes: usize = bucket.iter().map(|c| c.len()).sum();
        assert!(bytes < 13, "bucket {:?} reached the limit", bucket);
    }

    // Order and positions survive bucketing.
    assert_eq!(pipeline.sink().inner.texts(&doc.key()), doc.chunks);
    assert!(pipeline.sink().deletes().is_empty());
}

#[tokio::test]
async fn test_failed_bucket_rolls_back_document() {
    let pipeline = IngestPipeline::new(RecordingSink::failing_on(2), 13);
    let doc = facts_doc();

    // Another document already indexed must survive the rollback.
    let other = StoreDocument::new("other.txt", 7);
    pipeline
        .sink()
        .inner
        .add(&other, 0, &["keep me".to_string()])
        .await
        .unwrap();

    let err = pipeline.ingest(&doc).await.unwrap_err();
    let ingest_err = err.downcast_ref::<IngestError>().expect("typed ingest error");
    assert_eq!(ingest_err.bucket, 2);
    assert!(ingest_err.rolled_back());
    assert!(err.to_string().contains("injected failure on bucket 2"));

    assert_eq!(pipeline.sink().deletes(), vec![doc.key()]);
    assert!(pipeline.sink().inner.texts(&doc.key()).is_empty());
    assert_eq!(pipeline.get_ingested().await.unwrap(), vec![other]);
}

#[tokio::test]
async fn test_failed_first_bucket_still_rolls_back() {
    let pipeline = IngestPipeline::new(RecordingSink::failing_on(0), 13);
    let doc = facts_doc();

    assert!(pipeline.ingest(&doc).await.is_err());
    assert_eq!(pipeline.sink().deletes(), vec![doc.key()]);
    assert!(pipeline.sink().adds().is_empty());
}

#[tokio::test]
async fn test_failed_final_bucket_rolls_back() {
    let pipeline = IngestPipeline::new(RecordingSink::failing_on(3), 13);
    let doc = facts_doc();

    assert!(pipeline.ingest(&doc).await.is_err());
    assert_eq!(pipeline.sink().adds().len(), 3);
    assert!(pipeline.get_ingested().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rollback_failure_reported_with_original_error() {
    let sink = RecordingSink {
        fail_on_add: Some(1),
        fail_delete: true,
        ..Default::default()
    };
    let pipeline = IngestPipeline::new(sink, 13);

    let err = pipeline.ingest(&facts_doc()).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("injected failure on bucket 1"), "{}", msg);
    assert!(msg.contains("rollback failed: injected delete failure"), "{}", msg);

    let ingest_err = err.downcast_ref::<IngestError>().unwrap();
    assert!(!ingest_err.rolled_back());
}

#[tokio::test]
async fn test_empty_document_issues_one_empty_upload() {
    let pipeline = IngestPipeline::new(RecordingSink::default(), 13);
    let doc = Document {
        path: "empty.txt".to_string(),
        checksum: 0,
        chunks: Vec::new(),
    };

    pipeline.ingest(&doc).await.unwrap();

    assert_eq!(pipeline.sink().adds(), vec![Vec::<String>::new()]);
    assert_eq!(pipeline.get_ingested().await.unwrap(), vec![doc.key()]);
}

#[tokio::test]
async fn test_forget_removes_only_that_version() {
    let pipeline = IngestPipeline::new(InMemoryCollection::new(), 64);
    let v1 = Document {
        path: "a.txt".to_string(),
        checksum: 1,
        chunks: vec!["old".to_string()],
    };
    let v2 = Document {
        path: "a.txt".to_string(),
        checksum: 2,
        chunks: vec!["new".to_string()],
    };
    pipeline.ingest(&v1).await.unwrap();
    pipeline.ingest(&v2).await.unwrap();

    pipeline.forget(&v1.key()).await.unwrap();

    assert_eq!(pipeline.get_ingested().await.unwrap(), vec![v2.key()]);
    assert_eq!(pipeline.sink().texts(&v2.key()), vec!["new"]);
}
