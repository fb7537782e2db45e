//! # docwatch core
//!
//! Runtime-free logic shared by every docwatch frontend: document models,
//! overlapping-window chunking, content fingerprints, the disk-vs-store
//! sync planner, the [`store::Store`] contract and the bucketed ingestion
//! pipeline that implements it on top of a [`store::ChunkSink`].
//!
//! This crate contains no tokio, filesystem walking, or database code.
//! Backends and the watch loop live in the `docwatch` crate.

pub mod chunk;
pub mod event;
pub mod fingerprint;
pub mod models;
pub mod pipeline;
pub mod plan;
pub mod store;
