//! Filesystem notification source and the watch loop.
//!
//! [`FsNotifier`] wraps a `notify::RecommendedWatcher` over the registry
//! root and bridges its callback thread onto tokio channels: one for
//! events, one for watcher errors. Raw events pass through the debouncer
//! and reach [`run_watch_loop`], which hands each coalesced event to the
//! registry.
//!
//! ```text
//! notify thread ──try_send──▶ raw ──▶ debouncer ──▶ coalesced ─┐
//!               ──try_send──▶ errors ──────────────────────────┤
//!                              CancellationToken ──────────────┴─▶ run_watch_loop
//! ```
//!
//! # Mapping notify kinds
//!
//! | notify | Op |
//! |--------|----|
//! | `Create(_)` | `CREATE` |
//! | `Modify(Name(From))` | `RENAME` on the old path |
//! | `Modify(Name(To))` | `CREATE` on the new path |
//! | `Modify(Name(Both))` | `RENAME` on the old path, `CREATE` on the new one |
//! | `Modify(Name(Any / Other))` | `CREATE` if the path exists, else `RENAME` |
//! | `Modify(Metadata(_))` | dropped |
//! | other `Modify(_)` | `WRITE` |
//! | `Remove(_)` | `REMOVE` |
//! | `Access(_)`, `Any`, `Other` | dropped |

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::debounce::{spawn_debouncer, EVENT_BUFFER};
use crate::registry::DocRegistry;
use docwatch_core::event::{FsEvent, Op};

const ERROR_BUFFER: usize = 64;

// ═══════════════════════════════════════════════════════════════════════
// Notification source
// ═══════════════════════════════════════════════════════════════════════

/// Recursive watch on one directory. Dropping it stops the watch and
/// closes both channels.
pub struct FsNotifier {
    watcher: RecommendedWatcher,
    events: mpsc::Receiver<FsEvent>,
    errors: mpsc::Receiver<notify::Error>,
}

impl FsNotifier {
    pub fn watch(root: &Path) -> Result<Self> {
        let (event_tx, events) = mpsc::channel(EVENT_BUFFER);
        let (error_tx, errors) = mpsc::channel(ERROR_BUFFER);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for mapped in map_notify_event(event) {
                    if let Err(e) = event_tx.try_send(mapped) {
                        warn!(error = %e, "filesystem event dropped");
                    }
                }
            }
            Err(e) => {
                if error_tx.try_send(e).is_err() {
                    debug!("watcher error dropped");
                }
            }
        })
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        Ok(Self {
            watcher,
            events,
            errors,
        })
    }

    pub fn into_parts(
        self,
    ) -> (
        RecommendedWatcher,
        mpsc::Receiver<FsEvent>,
        mpsc::Receiver<notify::Error>,
    ) {
        (self.watcher, self.events, self.errors)
    }
}

fn map_notify_event(event: Event) -> Vec<FsEvent> {
    let Event { kind, paths, .. } = event;

    if let EventKind::Modify(ModifyKind::Name(mode)) = kind {
        return map_rename(paths, mode);
    }

    let op = match kind {
        EventKind::Create(_) => Op::CREATE,
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => Op::WRITE,
        EventKind::Remove(_) => Op::REMOVE,
        _ => return Vec::new(),
    };

    paths.into_iter().map(|path| FsEvent::new(path, op)).collect()
}

fn map_rename(paths: Vec<PathBuf>, mode: RenameMode) -> Vec<FsEvent> {
    match mode {
        RenameMode::Both => {
            let mut events = Vec::with_capacity(2);
            if let Some(from) = paths.first() {
                events.push(FsEvent::new(from.clone(), Op::RENAME));
            }
            if let Some(to) = paths.get(1) {
                events.push(FsEvent::new(to.clone(), Op::CREATE));
            }
            events
        }
        RenameMode::From => paths
            .into_iter()
            .map(|path| FsEvent::new(path, Op::RENAME))
            .collect(),
        RenameMode::To => paths
            .into_iter()
            .map(|path| FsEvent::new(path, Op::CREATE))
            .collect(),
        RenameMode::Any | RenameMode::Other => paths
            .into_iter()
            .map(|path| {
                let op = if std::fs::symlink_metadata(&path).is_ok() {
                    Op::CREATE
                } else {
                    Op::RENAME
                };
                FsEvent::new(path, op)
            })
            .collect(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Watch loop
// ═══════════════════════════════════════════════════════════════════════

/// Hand coalesced events to `registry` until `cancel` fires or the event
/// stream closes.
///
/// A failing event is logged and the loop carries on. Watcher errors are
/// logged.
pub async fn run_watch_loop(
    registry: &DocRegistry,
    events: &mut mpsc::Receiver<FsEvent>,
    errors: &mut mpsc::Receiver<notify::Error>,
    cancel: &CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("watch cancelled");
                break;
            }
            received = events.recv() => match received {
                Some(event) => handle_logged(registry, &event).await,
                None => {
                    info!("event stream closed");
                    break;
                }
            },
            Some(err) = errors.recv() => {
                warn!(error = %err, "filesystem watcher error");
            }
        }
    }
}

async fn handle_logged(registry: &DocRegistry, event: &FsEvent) {
    if let Err(e) = registry.handle_event(event).await {
        error!(
            path = %event.path.display(),
            op = %event.op,
            error = %format!("{:#}", e),
            "failed to handle filesystem event"
        );
    }
}

/// Watch `registry`'s root until `cancel` fires.
///
/// On cancellation the watcher is closed and events still waiting in the
/// debouncer are applied before the task ends.
pub fn spawn_watch(
    registry: Arc<DocRegistry>,
    delay: Duration,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>> {
    let (watcher, raw, mut errors) = FsNotifier::watch(registry.root())?.into_parts();
    let (mut coalesced, debouncer) = spawn_debouncer(delay, raw);

    info!(root = %registry.root().display(), "watching for changes");

    Ok(tokio::spawn(async move {
        run_watch_loop(&registry, &mut coalesced, &mut errors, &cancel).await;

        drop(watcher);
        while let Some(event) = coalesced.recv().await {
            handle_logged(&registry, &event).await;
        }
        if let Err(e) = debouncer.await {
            error!(error = %e, "debouncer task failed");
        }
        info!("watch stopped");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_create_write_remove() {
        assert_eq!(
            map_notify_event(event(EventKind::Create(CreateKind::File), &["/r/a.txt"])),
            vec![FsEvent::new("/r/a.txt", Op::CREATE)]
        );
        assert_eq!(
            map_notify_event(event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/r/a.txt"]
            )),
            vec![FsEvent::new("/r/a.txt", Op::WRITE)]
        );
        assert_eq!(
            map_notify_event(event(EventKind::Remove(RemoveKind::File), &["/r/a.txt"])),
            vec![FsEvent::new("/r/a.txt", Op::REMOVE)]
        );
    }

    #[test]
    fn test_rename_both_maps_to_rename_then_create() {
        let mapped = map_notify_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/r/old.txt", "/r/new.txt"],
        ));
        assert_eq!(
            mapped,
            vec![
                FsEvent::new("/r/old.txt", Op::RENAME),
                FsEvent::new("/r/new.txt", Op::CREATE),
            ]
        );
    }

    #[test]
    fn test_rename_halves() {
        assert_eq!(
            map_notify_event(event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &["/r/old.txt"]
            )),
            vec![FsEvent::new("/r/old.txt", Op::RENAME)]
        );
        assert_eq!(
            map_notify_event(event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                &["/r/new.txt"]
            )),
            vec![FsEvent::new("/r/new.txt", Op::CREATE)]
        );
    }

    #[test]
    fn test_ambiguous_rename_checks_existence() {
        let tmp = tempfile::TempDir::new().unwrap();
        let present = tmp.path().join("present.txt");
        std::fs::write(&present, "x").unwrap();
        let absent = tmp.path().join("absent.txt");

        let mapped = map_rename(vec![present.clone(), absent.clone()], RenameMode::Any);
        assert_eq!(
            mapped,
            vec![
                FsEvent::new(present, Op::CREATE),
                FsEvent::new(absent, Op::RENAME),
            ]
        );
    }

    #[test]
    fn test_metadata_and_access_dropped() {
        assert!(map_notify_event(event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/r/a.txt"]
        ))
        .is_empty());
        assert!(map_notify_event(event(
            EventKind::Access(AccessKind::Read),
            &["/r/a.txt"]
        ))
        .is_empty());
        assert!(map_notify_event(event(EventKind::Any, &["/r/a.txt"])).is_empty());
    }
}
