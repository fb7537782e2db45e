//! In-memory [`ChunkSink`] implementation for tests and dry runs.
//!
//! Uses a `Vec` and a `BTreeSet` behind `std::sync::RwLock` for thread
//! safety. Chunks keep their owner tag and position so callers can inspect
//! exactly what an ingest uploaded. Owners are tracked separately so a
//! document with no chunks is still reported as ingested.

use std::collections::BTreeSet;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::StoreDocument;

use super::ChunkSink;

#[derive(Debug, Clone)]
struct StoredChunk {
    _id: String,
    owner: StoreDocument,
    index: usize,
    text: String,
}

/// In-memory chunk collection.
pub struct InMemoryCollection {
    chunks: RwLock<Vec<StoredChunk>>,
    owners: RwLock<BTreeSet<StoreDocument>>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            owners: RwLock::new(BTreeSet::new()),
        }
    }

    /// Total number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Texts stored for `owner`, in document order.
    pub fn texts(&self, owner: &StoreDocument) -> Vec<String> {
        let chunks = self.chunks.read().unwrap();
        let mut owned: Vec<&StoredChunk> = chunks.iter().filter(|c| &c.owner == owner).collect();
        owned.sort_by_key(|c| c.index);
        owned.into_iter().map(|c| c.text.clone()).collect()
    }
}

impl Default for InMemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkSink for InMemoryCollection {
    async fn add(
        &self,
        owner: &StoreDocument,
        first_index: usize,
        chunks: &[String],
    ) -> Result<()> {
        self.owners.write().unwrap().insert(owner.clone());
        let mut stored = self.chunks.write().unwrap();
        for (i, text) in chunks.iter().enumerate() {
            stored.push(StoredChunk {
                _id: Uuid::new_v4().to_string(),
                owner: owner.clone(),
                index: first_index + i,
                text: text.clone(),
            });
        }
        Ok(())
    }

    async fn delete(&self, owner: &StoreDocument) -> Result<()> {
        self.chunks.write().unwrap().retain(|c| &c.owner != owner);
        self.owners.write().unwrap().remove(owner);
        Ok(())
    }

    async fn owners(&self) -> Result<Vec<StoreDocument>> {
        Ok(self.owners.read().unwrap().iter().cloned().collect())
    }
}
