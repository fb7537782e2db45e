//! Disk-vs-store set difference.
//!
//! The disk side is keyed by relative path (last entry wins on duplicate
//! paths). A disk document with no store entry at the same path and
//! checksum is planned for ingestion. Every distinct store entry whose
//! path is missing from disk, or whose checksum differs from the disk
//! one, is planned for forgetting; a store holding two checksums for one
//! path (left behind by an interrupted update) therefore loses the stale
//! one. Matching pairs are left alone, so planning against an unchanged
//! store is a no-op.
//!
//! Output is ordered by path so passes are reproducible.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{DiskDocument, StoreDocument};

/// Actions computed by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Disk documents to ingest under their current checksum.
    pub ingest: Vec<DiskDocument>,
    /// Store documents to forget under the checksum the store holds.
    pub forget: Vec<StoreDocument>,
    /// Number of documents identical on both sides.
    pub unchanged: usize,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.ingest.is_empty() && self.forget.is_empty()
    }
}

/// Plan ingest and forget actions for one snapshot of each side.
pub fn plan_sync(disk: &[DiskDocument], stored: &[StoreDocument]) -> SyncPlan {
    let disk_map: BTreeMap<&str, &DiskDocument> =
        disk.iter().map(|d| (d.path.as_str(), d)).collect();
    let store_set: BTreeSet<&StoreDocument> = stored.iter().collect();

    let mut plan = SyncPlan::default();

    for disk_doc in disk_map.values() {
        let key = StoreDocument::from(*disk_doc);
        if store_set.contains(&key) {
            plan.unchanged += 1;
        } else {
            plan.ingest.push((*disk_doc).clone());
        }
    }

    for store_doc in store_set {
        match disk_map.get(store_doc.path.as_str()) {
            Some(disk_doc) if disk_doc.checksum == store_doc.checksum => {}
            _ => plan.forget.push(store_doc.clone()),
        }
    }

    plan
}
