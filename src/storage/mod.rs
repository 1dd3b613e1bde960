//! # Storage Engine
//!
//! Instances of a compiled schema, addressed by index, with transactional
//! writes layered over flat bit buffers.
//!
//! ## Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────┐
//!   write ───────> │ TransactionManager (pending)  │ ──┐
//!                  └───────────────────────────────┘   │ commit
//!   read  ──┬─────────────── overlay ──────────────────┤
//!           │      ┌───────────────────────────────┐   v
//!           └────> │ segments: Vec<BitBuffer>      │ <─ apply
//!                  │ objects:  ObjectTable         │
//!                  │ lists:    (struct, index) ->  │
//!                  │           Storage             │
//!                  └───────────────────────────────┘
//!                                  │
//!                                  v
//!                         ListenerRegistry::notify(ActionSet)
//! ```
//!
//! ## Ownership
//!
//! A storage exclusively owns its buffers, its list children and its
//! listeners. All mutation takes `&mut self`, so a reference to a list child
//! obtained from `list()` cannot outlive a `create_or_clear_list` that
//! replaces it. `Storage` is `Send`; share it across threads behind a lock.
//!
//! ## Module Organization
//!
//! - `bits`: `BitBuffer`, word-backed bit addressing
//! - `objects`: slot table for object fields
//! - `store`: `Storage` itself
//! - `builder`: `StorageBuilder`
//! - `snapshot`: `StorageSnapshot` and its byte header

mod bits;
mod builder;
mod objects;
mod snapshot;
mod store;

#[cfg(test)]
mod tests;

pub use builder::StorageBuilder;
pub use snapshot::{SnapshotHeader, StorageSnapshot, SNAPSHOT_HEADER_SIZE};
pub use store::Storage;
