//! # Storage Builder
//!
//! Fluent configuration for a [`Storage`], mirroring how a compiled schema is
//! turned into a live instance:
//!
//! ```ignore
//! let storage = Storage::builder(schema)
//!     .capacity(1024)
//!     .object_slots(64)
//!     .build()?;
//! ```
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | capacity | required | Number of root instances, fixed for the storage's lifetime |
//! | object_slots | 0 | Object table entries reserved up front |

use std::sync::Arc;

use eyre::{bail, Result};

use crate::layout::CompiledSchema;
use crate::storage::Storage;

pub struct StorageBuilder {
    schema: Arc<CompiledSchema>,
    capacity: Option<usize>,
    object_slots: Option<usize>,
}

impl StorageBuilder {
    pub fn new(schema: Arc<CompiledSchema>) -> Self {
        Self {
            schema,
            capacity: None,
            object_slots: None,
        }
    }

    /// Number of root instances. Root storages never grow.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Pre-sizes the object table. Purely an allocation hint.
    pub fn object_slots(mut self, slots: usize) -> Self {
        self.object_slots = Some(slots);
        self
    }

    pub fn get_capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn get_object_slots(&self) -> Option<usize> {
        self.object_slots
    }

    pub fn build(self) -> Result<Storage> {
        let Some(capacity) = self.capacity else {
            bail!("storage capacity must be set before build()");
        };
        Storage::allocate(
            self.schema,
            capacity,
            false,
            self.object_slots.unwrap_or_default(),
        )
    }
}
