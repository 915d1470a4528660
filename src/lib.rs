//! rdelta: rsync-style delta synchronization in Rust.
//!
//! The crate provides:
//! - Block signatures of old content (`sync::signature`)
//! - Delta generation against a signature with a rolling checksum (`sync::delta`)
//! - Reconstruction from old content plus a delta (`sync::patch`)
//! - A threaded pipeline joining the stages with bounded channels (`sync::pipeline`)
//! - Byte formats for signatures and deltas (`wire`)
//! - File-oriented helpers (`io`, `file-io` feature)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use rdelta::{SyncOptions, engine};
//!
//! let old = b"I am the original content";
//! let new = b"I am the new content";
//! let opts = SyncOptions::with_block_size(4);
//!
//! let signature = engine::signature(old, &opts).unwrap();
//! let ops = engine::delta(signature, new, &opts).unwrap();
//! let rebuilt = engine::patch(old, &ops, &opts).unwrap();
//! assert_eq!(rebuilt, new);
//! ```
//!
//! The streaming entry points ([`build_signature`], [`build_delta`],
//! [`apply_delta`]) hand each record or operation to a callback as soon as
//! it is ready, so the stages can run on separate threads or machines.

pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod sync;
pub mod wire;

#[cfg(feature = "file-io")]
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::SyncOptions;
pub use error::{Error, Result};
pub use hash::{StrongHash, StrongHasher};
pub use sync::{
    BlockRecord, Operation, apply_delta, build_delta, build_signature, sync_streams,
    try_apply_delta,
};
