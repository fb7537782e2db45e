//! Document records exchanged between the registry and a store.

use serde::Serialize;

/// A readable file found under the registry root.
///
/// `path` is relative to the root; `checksum` is the CRC-32 of the text
/// its reader produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiskDocument {
    pub path: String,
    pub checksum: u32,
}

/// A document the store reports as ingested.
///
/// Identified by the `(path, checksum)` pair carried in every chunk's
/// metadata. A changed file is never updated in place: its old pair is
/// forgotten and the new pair ingested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StoreDocument {
    pub path: String,
    pub checksum: u32,
}

impl StoreDocument {
    pub fn new(path: impl Into<String>, checksum: u32) -> Self {
        Self {
            path: path.into(),
            checksum,
        }
    }
}

impl From<&DiskDocument> for StoreDocument {
    fn from(doc: &DiskDocument) -> Self {
        Self {
            path: doc.path.clone(),
            checksum: doc.checksum,
        }
    }
}

/// A document ready for ingestion: its identity plus ordered chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub checksum: u32,
    pub chunks: Vec<String>,
}

impl Document {
    /// The `(path, checksum)` pair every uploaded chunk is tagged with.
    pub fn key(&self) -> StoreDocument {
        StoreDocument {
            path: self.path.clone(),
            checksum: self.checksum,
        }
    }
}
