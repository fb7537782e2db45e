//! Document registry: keeps the index in step with a directory tree.
//!
//! A [`DocRegistry`] owns the registry root, the ordered readers, the
//! chunker and a handle to the [`Store`]. It does two jobs:
//!
//! - **Reconciliation** ([`DocRegistry::sync`]): walk the root, fingerprint
//!   every readable file, diff against one snapshot of the store, ingest
//!   what is new or changed and forget what is gone or stale.
//! - **Event handling** ([`DocRegistry::handle_event`]): apply one
//!   coalesced filesystem event to the store.
//!
//! ```text
//!            ┌────────────┐   DiskDocument    ┌───────────┐
//!  root ───▶ │ walk+read  │ ────────────────▶ │ plan_sync │ ◀── store.get_ingested()
//!            └────────────┘                   └─────┬─────┘
//!                                    ingest / forget│
//!            ┌────────────┐   Document              ▼
//!  file ───▶ │  chunkify  │ ──────────────▶  store.ingest / store.forget
//!            └────────────┘
//! ```
//!
//! # Event flags
//!
//! Flags on one event are checked in order and are not exclusive:
//!
//! | Flag | Action |
//! |------|--------|
//! | `WRITE` or `CREATE` | forget every version at the path, then ingest the current file, or every file beneath it for a directory |
//! | `RENAME` | forget every version at the (old) path |
//! | `REMOVE` | forget every version at the path |
//!
//! A rename only forgets. The new name arrives as its own `CREATE` event.
//! When the first row already forgot the path, the later rows do not forget
//! it again, so a file written and then renamed over within one debounce
//! window keeps its fresh ingest.
//!
//! Files with no matching reader are skipped with a warning; they are
//! never ingested and never forgotten by the walk. Files excluded by the
//! path filter are treated the same way.
//!
//! # Errors
//!
//! Walk, read and store errors abort a reconciliation pass and are
//! returned to the caller. A half-finished pass leaves nothing that the
//! next pass cannot repair.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn, Span};

use crate::config::Config;
use crate::readers::{Reader, ReaderRegistry};
use crate::walk::{ensure_dir, relative_path, walk_files, PathFilter};
use docwatch_core::chunk::Chunker;
use docwatch_core::event::{FsEvent, Op};
use docwatch_core::fingerprint::checksum;
use docwatch_core::models::{DiskDocument, Document, StoreDocument};
use docwatch_core::plan::plan_sync;
use docwatch_core::store::Store;

// ═══════════════════════════════════════════════════════════════════════
// Results
// ═══════════════════════════════════════════════════════════════════════

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub ingested: usize,
    pub forgotten: usize,
    pub unchanged: usize,
    /// Files with no reader.
    pub skipped: usize,
}

impl SyncReport {
    /// True when the pass changed nothing in the store.
    pub fn is_noop(&self) -> bool {
        self.ingested == 0 && self.forgotten == 0
    }
}

/// Readable documents found under the root.
#[derive(Debug, Clone, Default)]
pub struct DiskScan {
    pub docs: Vec<DiskDocument>,
    pub skipped: usize,
}

/// What [`DocRegistry::ingest_file`] did with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested { checksum: u32, chunks: usize },
    /// No reader claims the file.
    Unsupported,
    /// The path filter rejects the file.
    Excluded,
    /// Nothing readable at the path: gone, or not a regular file.
    Missing,
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

pub struct DocRegistry {
    root: PathBuf,
    readers: ReaderRegistry,
    chunker: Chunker,
    store: Arc<dyn Store>,
    filter: PathFilter,
    follow_symlinks: bool,
    span: Span,
}

impl DocRegistry {
    /// Create a registry over `root`, creating the directory if needed.
    ///
    /// Every log line the registry emits is parented to `span`.
    pub fn new(
        root: &Path,
        readers: ReaderRegistry,
        chunker: Chunker,
        store: Arc<dyn Store>,
        span: Span,
    ) -> Result<Self> {
        Ok(Self {
            root: ensure_dir(root)?,
            readers,
            chunker,
            store,
            filter: PathFilter::allow_all(),
            follow_symlinks: false,
            span,
        })
    }

    pub fn from_config(config: &Config, store: Arc<dyn Store>, span: Span) -> Result<Self> {
        let chunker = Chunker::new(config.chunking.size, config.chunking.overlap)?;
        let filter = PathFilter::new(
            &config.registry.include_globs,
            &config.registry.exclude_globs,
        )?;
        Ok(Self::new(
            &config.registry.root,
            ReaderRegistry::from_config(&config.readers),
            chunker,
            store,
            span,
        )?
        .with_filter(filter)
        .with_follow_symlinks(config.registry.follow_symlinks))
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Canonical registry root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ───────────────────────────────────────────────────────────────────
    // Reconciliation
    // ───────────────────────────────────────────────────────────────────

    /// Run one full reconciliation pass.
    ///
    /// Must not run concurrently with itself on the same registry.
    pub async fn sync(&self) -> Result<SyncReport> {
        ensure_dir(&self.root)?;

        let stored = self
            .store
            .get_ingested()
            .await
            .context("Failed to list ingested documents")?;
        let scan = self.collect_docs().await?;
        let plan = plan_sync(&scan.docs, &stored);

        info!(
            parent: &self.span,
            on_disk = scan.docs.len(),
            in_store = stored.len(),
            to_ingest = plan.ingest.len(),
            to_forget = plan.forget.len(),
            skipped = scan.skipped,
            "sync planned"
        );

        let mut report = SyncReport {
            unchanged: plan.unchanged,
            skipped: scan.skipped,
            ..Default::default()
        };

        // Ingest re-reads the file, so the version it stores can differ from
        // the scanned one and even equal a version planned for forgetting.
        let mut fresh = HashSet::new();
        for doc in &plan.ingest {
            if let IngestOutcome::Ingested { checksum, .. } = self.ingest_file(&doc.path).await? {
                fresh.insert(StoreDocument::new(doc.path.as_str(), checksum));
                report.ingested += 1;
            }
        }

        for doc in plan.forget.iter().filter(|d| !fresh.contains(*d)) {
            self.store
                .forget(doc)
                .await
                .with_context(|| format!("Failed to forget {} (crc {})", doc.path, doc.checksum))?;
            info!(parent: &self.span, file = %doc.path, crc = doc.checksum, "forgot document");
            report.forgotten += 1;
        }

        info!(
            parent: &self.span,
            ingested = report.ingested,
            forgotten = report.forgotten,
            unchanged = report.unchanged,
            "sync complete"
        );
        Ok(report)
    }

    /// Walk the root and fingerprint every readable file.
    pub async fn collect_docs(&self) -> Result<DiskScan> {
        let root = self.root.clone();
        let filter = self.filter.clone();
        let readers = self.readers.clone();
        let follow = self.follow_symlinks;
        let span = self.span.clone();

        tokio::task::spawn_blocking(move || scan_disk(&root, &filter, &readers, follow, &span))
            .await
            .context("Disk scan task failed")?
    }

    // ───────────────────────────────────────────────────────────────────
    // Single documents
    // ───────────────────────────────────────────────────────────────────

    /// Read, chunk and ingest the file at `relative`.
    ///
    /// A missing file, a directory, an excluded path or a file with no
    /// reader is a logged no-op.
    pub async fn ingest_file(&self, relative: &str) -> Result<IngestOutcome> {
        if !self.filter.allows(relative) {
            debug!(parent: &self.span, file = %relative, "path excluded, not ingesting");
            return Ok(IngestOutcome::Excluded);
        }

        let path = self.root.join(relative);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(IngestOutcome::Missing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(parent: &self.span, file = %relative, "file vanished before ingest");
                return Ok(IngestOutcome::Missing);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
            }
        }

        let Some(reader) = self.readers.find(&path) else {
            warn!(parent: &self.span, file = %relative, "no reader for file, skipping");
            return Ok(IngestOutcome::Unsupported);
        };

        let text = read_blocking(reader, path).await?;
        let doc = Document {
            path: relative.to_string(),
            checksum: checksum(&text),
            chunks: self.chunker.chunkify(&text),
        };

        self.store
            .ingest(&doc)
            .await
            .with_context(|| format!("Failed to ingest {}", relative))?;

        info!(
            parent: &self.span,
            file = %relative,
            crc = doc.checksum,
            chunks = doc.chunks.len(),
            "ingested document"
        );
        Ok(IngestOutcome::Ingested {
            checksum: doc.checksum,
            chunks: doc.chunks.len(),
        })
    }

    /// Ingest the file at `relative` or, when it names a directory, every
    /// file beneath it. Returns how many documents were ingested.
    ///
    /// A directory arrives this way when one is created or moved into the
    /// tree: the watcher reports the directory, not its contents.
    pub async fn ingest_path(&self, relative: &str) -> Result<usize> {
        let path = self.root.join(relative);
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            let outcome = self.ingest_file(relative).await?;
            return Ok(usize::from(matches!(outcome, IngestOutcome::Ingested { .. })));
        }

        let follow = self.follow_symlinks;
        let files = tokio::task::spawn_blocking(move || {
            walk_files(&path, &PathFilter::allow_all(), follow)
        })
        .await
        .context("Directory walk task failed")??;

        debug!(parent: &self.span, dir = %relative, files = files.len(), "ingesting directory");

        let mut ingested = 0;
        for file in files {
            let Some(rel) = relative_path(&self.root, &file.absolute) else {
                continue;
            };
            if let IngestOutcome::Ingested { .. } = self.ingest_file(&rel).await? {
                ingested += 1;
            }
        }
        Ok(ingested)
    }

    /// Forget every stored version at `relative` and, if it named a
    /// directory, every version beneath it. Returns how many were forgotten.
    pub async fn forget_file(&self, relative: &str) -> Result<usize> {
        let stored = self
            .store
            .get_ingested()
            .await
            .context("Failed to list ingested documents")?;
        let prefix = format!("{}/", relative);

        let mut forgotten = 0;
        for doc in stored
            .iter()
            .filter(|d| d.path == relative || d.path.starts_with(&prefix))
        {
            self.store
                .forget(doc)
                .await
                .with_context(|| format!("Failed to forget {} (crc {})", doc.path, doc.checksum))?;
            info!(parent: &self.span, file = %doc.path, crc = doc.checksum, "forgot document");
            forgotten += 1;
        }
        Ok(forgotten)
    }

    // ───────────────────────────────────────────────────────────────────
    // Events
    // ───────────────────────────────────────────────────────────────────

    /// Apply one coalesced filesystem event.
    ///
    /// Events outside the root, for the root itself, or for excluded paths
    /// are ignored.
    pub async fn handle_event(&self, event: &FsEvent) -> Result<()> {
        let Some(relative) = relative_path(&self.root, &event.path) else {
            debug!(parent: &self.span, path = %event.path.display(), "event outside registry root");
            return Ok(());
        };
        if !self.filter.allows(&relative) {
            return Ok(());
        }

        debug!(parent: &self.span, file = %relative, op = %event.op, "handling event");

        let mut forgotten = false;

        if event.op.intersects(Op::WRITE | Op::CREATE) {
            self.forget_file(&relative).await?;
            forgotten = true;
            if let Err(e) = self.ingest_path(&relative).await {
                warn!(
                    parent: &self.span,
                    file = %relative,
                    "document forgotten but not re-ingested; next sync will restore it"
                );
                return Err(e);
            }
        }

        if event.op.has(Op::RENAME) && !forgotten {
            self.forget_file(&relative).await?;
            forgotten = true;
        }

        if event.op.has(Op::REMOVE) && !forgotten {
            self.forget_file(&relative).await?;
        }

        Ok(())
    }
}

fn scan_disk(
    root: &Path,
    filter: &PathFilter,
    readers: &ReaderRegistry,
    follow_symlinks: bool,
    span: &Span,
) -> Result<DiskScan> {
    let mut scan = DiskScan::default();

    for file in walk_files(root, filter, follow_symlinks)? {
        let Some(reader) = readers.find(&file.absolute) else {
            warn!(parent: span, file = %file.relative, "no reader for file, skipping");
            scan.skipped += 1;
            continue;
        };
        let text = reader
            .read_text(&file.absolute)
            .with_context(|| format!("Failed to read {}", file.relative))?;
        scan.docs.push(DiskDocument {
            path: file.relative,
            checksum: checksum(&text),
        });
    }

    Ok(scan)
}

async fn read_blocking(reader: Arc<dyn Reader>, path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || reader.read_text(&path))
        .await
        .context("Reader task failed")?
}
