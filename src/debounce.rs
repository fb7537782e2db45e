//! Per-path coalescing of filesystem notifications.
//!
//! One task owns the pending map and the timer queue. Every raw event
//! and every timer expiry is handled by that task, so nothing else ever
//! touches the map.
//!
//! ```text
//!  raw FsEvent ──▶ ┌───────────────────────────────┐
//!                  │ pending: path → (ops, timer)  │ ──▶ coalesced FsEvent
//!  timer expiry ─▶ └───────────────────────────────┘
//! ```
//!
//! - First event for a path: buffer it and start a timer of `delay`.
//! - Further events for that path: OR the flags in and restart the timer.
//! - Timer expiry: emit the merged event and drop the entry. A later
//!   event for the path starts a fresh entry.
//! - Input closed: emit everything still pending, then close the output.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::time::{delay_queue, DelayQueue};

use docwatch_core::event::{FsEvent, Op};

/// Capacity of the coalesced event channel.
pub const EVENT_BUFFER: usize = 1024;

/// Spawn a debouncer reading `input`. Returns the coalesced stream.
pub fn spawn_debouncer(
    delay: Duration,
    input: mpsc::Receiver<FsEvent>,
) -> (mpsc::Receiver<FsEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let handle = tokio::spawn(debounce(delay, input, tx));
    (rx, handle)
}

/// Coalesce `input` into `output` until `input` closes or `output` is dropped.
pub async fn debounce(
    delay: Duration,
    mut input: mpsc::Receiver<FsEvent>,
    output: mpsc::Sender<FsEvent>,
) {
    let mut pending: HashMap<PathBuf, (Op, delay_queue::Key)> = HashMap::new();
    let mut timers: DelayQueue<PathBuf> = DelayQueue::new();

    loop {
        tokio::select! {
            received = input.recv() => match received {
                Some(event) => match pending.get_mut(&event.path) {
                    Some((op, key)) => {
                        *op |= event.op;
                        timers.reset(key, delay);
                    }
                    None => {
                        let key = timers.insert(event.path.clone(), delay);
                        pending.insert(event.path, (event.op, key));
                    }
                },
                None => break,
            },
            Some(expired) = std::future::poll_fn(|cx| timers.poll_expired(cx)), if !timers.is_empty() => {
                let path = expired.into_inner();
                if let Some((op, _)) = pending.remove(&path) {
                    if output.send(FsEvent::new(path, op)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    for (path, (op, _)) in pending.drain() {
        if output.send(FsEvent::new(path, op)).await.is_err() {
            return;
        }
    }
}
