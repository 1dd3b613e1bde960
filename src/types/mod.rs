//! # Field Types and Runtime Values
//!
//! The core is type-parametric: a field is described by a [`FieldType`] that
//! fixes its storage width, and values cross the API as a [`Value`].
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `FieldType` | Logical type and storage width of a field |
//! | `Value` | Runtime value read from or written to a field |
//! | `ObjectRef` | Reference-counted object held by an object slot |
//!
//! ## Usage
//!
//! ```ignore
//! use structstore::types::{FieldType, Value};
//!
//! assert_eq!(FieldType::Int16.width_bits(), 16);
//! let v: Value = 42i32.into();
//! assert_eq!(v.as_int(), Some(42));
//! ```

mod field_type;
mod value;

pub use field_type::FieldType;
pub use value::{ObjectRef, Value};
pub(crate) use field_type::low_mask;
