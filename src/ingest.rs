//! Command drivers for `docwatch sync` and `docwatch watch`.
//!
//! Both open the SQLite collection, wrap it in the bucketing
//! [`IngestPipeline`], build a [`DocRegistry`] over the configured root and
//! run one reconciliation pass. `watch` then keeps the index current until
//! its [`CancellationToken`] fires.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span};

use crate::config::Config;
use crate::registry::{DocRegistry, SyncReport};
use crate::sqlite::SqliteCollection;
use crate::watch::spawn_watch;
use docwatch_core::pipeline::IngestPipeline;

/// A registry wired to the configured SQLite index.
pub struct Harness {
    pub registry: Arc<DocRegistry>,
    pub pipeline: Arc<IngestPipeline<SqliteCollection>>,
}

impl Harness {
    pub async fn open(config: &Config) -> Result<Self> {
        let collection = SqliteCollection::open(config).await?;
        let pipeline = Arc::new(IngestPipeline::new(collection, config.store.request_size));
        let span = info_span!("registry", root = %config.registry.root.display());
        let registry = DocRegistry::from_config(config, pipeline.clone(), span)
            .context("Failed to set up document registry")?;
        Ok(Self {
            registry: Arc::new(registry),
            pipeline,
        })
    }

    /// Drop the whole index so the next pass re-ingests everything.
    pub async fn reset(&self) -> Result<()> {
        let removed = self.pipeline.sink().reset().await?;
        info!(removed, "index reset");
        Ok(())
    }

    pub async fn close(&self) {
        self.pipeline.sink().close().await;
    }
}

/// One reconciliation pass, optionally from an empty index.
pub async fn run_sync(config: &Config, reset: bool) -> Result<SyncReport> {
    let harness = Harness::open(config).await?;
    if reset {
        harness.reset().await?;
    }
    let report = harness.registry.sync().await;
    harness.close().await;
    report
}

/// Sync, then apply filesystem changes until `cancel` fires.
pub async fn run_watch(config: &Config, reset: bool, cancel: CancellationToken) -> Result<()> {
    let harness = Harness::open(config).await?;
    if reset {
        harness.reset().await?;
    }

    let report = harness.registry.sync().await?;
    println!(
        "Initial sync: {} ingested, {} forgotten, {} unchanged, {} skipped",
        report.ingested, report.forgotten, report.unchanged, report.skipped
    );

    let task = spawn_watch(harness.registry.clone(), config.watch.debounce(), cancel)?;
    task.await.context("Watch task failed")?;

    harness.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_sync_then_reset() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("docs");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("a.txt"), "alpha").unwrap();
        std::fs::write(root.join("b.md"), "beta").unwrap();
        let config = Config::minimal(&root, tmp.path().join("index.sqlite"));

        let first = run_sync(&config, false).await.unwrap();
        assert_eq!(first.ingested, 2);

        let second = run_sync(&config, false).await.unwrap();
        assert!(second.is_noop());
        assert_eq!(second.unchanged, 2);

        let reset = run_sync(&config, true).await.unwrap();
        assert_eq!(reset.ingested, 2);
        assert_eq!(reset.forgotten, 0);
    }

    #[tokio::test]
    async fn test_run_watch_stops_on_cancel() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("docs");
        let config = Config::minimal(&root, tmp.path().join("index.sqlite"));

        let cancel = CancellationToken::new();
        cancel.cancel();
        run_watch(&config, false, cancel).await.unwrap();
        assert!(root.is_dir());
    }
}
