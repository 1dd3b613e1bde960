//! # structstore - Flat Storage for Hierarchical Records
//!
//! structstore compiles a hierarchical record schema into a densely packed,
//! fixed-stride layout and stores a large array of instances in shared bit
//! buffers. There is no per-instance heap object: a record is an index, and a
//! field is an offset resolved once at compile time.
//!
//! ## Quick Start
//!
//! ```ignore
//! use structstore::{compile, FieldType, PackedLayout, Storage, StructDef};
//!
//! let point = StructDef::builder("Point")
//!     .field("x", FieldType::Int32)
//!     .field("y", FieldType::Int32)
//!     .build()?;
//! let schema = compile(&point, &PackedLayout)?;
//!
//! let mut storage = Storage::new(schema, 1_000_000)?;
//! let x = storage.field("x")?;
//!
//! storage.select_structure(42)?;
//! storage.write(&x, 7)?;
//! let actions = storage.commit()?;
//! assert_eq!(storage.read(&x)?, 7.into());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Change Listeners  │   ActionSet    │
//! ├─────────────────────────────────────┤
//! │ Transaction Manager (pending log)   │
//! ├─────────────────────────────────────┤
//! │ Storage Engine (bit buffers, lists) │
//! ├─────────────────────────────────────┤
//! │ Compiled Schema (offsets, strides)  │
//! ├─────────────────────────────────────┤
//! │ Layout Compiler (packed / aligned)  │
//! ├─────────────────────────────────────┤
//! │ Schema Model (StructDef, FieldDef)  │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Storage Regions
//!
//! | Region | Sizing | Contents |
//! |--------|--------|----------|
//! | Root segment | `capacity × row_stride` | Fields, union tags, presence bits, inline children |
//! | Optional segment | `capacity × child_stride` | Body of one optional child, touched only when present |
//! | List child | per parent index, growable | An independent `Storage` of the list's own schema |
//!
//! ## Concurrency
//!
//! One logical owner per `Storage`. All mutation goes through `&mut self`
//! and there is no internal locking; sharing a storage across threads needs
//! external synchronisation. Distinct storages, including list children of
//! different parent indices, share no mutable state.
//!
//! ## Module Overview
//!
//! - [`config`]: layout and growth constants
//! - [`types`]: field types and runtime values
//! - [`schema`]: immutable schema model and builders
//! - [`layout`]: layout strategies, compiler, compiled schema and handles
//! - [`storage`]: backing buffers, cursor, lists, optionals, snapshots
//! - [`txn`]: pending writes, action sets and change listeners

pub mod config;
pub mod error;
pub mod layout;
pub mod schema;
pub mod storage;
pub mod txn;
pub mod types;

pub use error::{error_kind, ErrorKind, StructError};
pub use layout::{
    compile, AlignedLayout, CompiledField, CompiledSchema, CompiledStruct, FieldHandle,
    LayoutCompiler, LayoutStrategy, PackedLayout, StructHandle,
};
pub use schema::{FieldDef, StructBuilder, StructDef, StructFlags};
pub use storage::{Storage, StorageBuilder, StorageSnapshot};
pub use txn::{Action, ActionSet, ListenerId, TxnState};
pub use types::{FieldType, ObjectRef, Value};
