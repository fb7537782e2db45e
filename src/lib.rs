//! # docwatch
//!
//! Keeps a persisted document index in sync with a directory tree.
//!
//! docwatch runs one full reconciliation pass at startup, comparing the
//! files on disk against the documents recorded in the index by
//! `(path, CRC-32)`, then watches the tree and applies each change as it
//! settles. Document text is split into overlapping windows and uploaded
//! in size-bounded buckets; a failed upload is rolled back so no partial
//! document stays indexed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────────┐
//! │  notify  │──▶│ debouncer │──▶│ DocRegistry │──▶│IngestPipeline│──▶ SQLite
//! └──────────┘   └───────────┘   │ sync/events │   │ bucket+undo  │
//!                                └──────┬──────┘   └──────────────┘
//!                                       │
//!                                 ReaderRegistry
//!                               (text, pdf/docx/odt/xml)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docwatch init                 # create the index
//! docwatch sync                 # one reconciliation pass
//! docwatch watch                # sync, then follow changes until Ctrl-C
//! docwatch status               # list indexed documents
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`readers`] | Reader trait and first-match registry |
//! | [`extract`] | PDF / DOCX / ODT / XML text extraction |
//! | [`walk`] | Directory walking and glob filters |
//! | [`registry`] | Reconciliation and per-event handling |
//! | [`debounce`] | Per-path event coalescing |
//! | [`watch`] | notify bridge and watch loop |
//! | [`sqlite`] | SQLite chunk collection |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`ingest`] | `sync` / `watch` command drivers |
//! | [`status`] | `status` command |
//! | [`logging`] | tracing subscriber setup |
//!
//! Chunking, fingerprints, sync planning, the store contracts and the
//! ingestion pipeline live in `docwatch-core` and are re-exported here.

pub mod config;
pub mod db;
pub mod debounce;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod readers;
pub mod registry;
pub mod sqlite;
pub mod status;
pub mod walk;
pub mod watch;

pub use docwatch_core::{chunk, event, fingerprint, models, pipeline, plan, store};
