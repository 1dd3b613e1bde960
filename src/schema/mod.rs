//! # Schema Model
//!
//! Immutable description of a record: a tree of [`StructDef`] nodes, each
//! holding ordered [`FieldDef`] leaves and ordered child structs, with the
//! flags `list`, `optional` and `union`.
//!
//! ## Schema Hierarchy
//!
//! ```text
//! Root
//! ├── id: int64
//! ├── Position            (plain: folded into the parent's stride)
//! │   ├── x: float32
//! │   └── y: float32
//! ├── Extra  [optional]   (presence bit in parent, body in its own region)
//! │   └── note: object
//! ├── Items  [list]       (per-instance child storage, created on demand)
//! │   └── qty: int32
//! └── Shape  [union]      (fields share one region)
//!     ├── radius: float64
//!     └── side: int32
//! ```
//!
//! ## Name Resolution
//!
//! Fields and structs are addressed by dotted paths relative to the root,
//! e.g. `"Position.x"` or `"Items.qty"`. The root itself is the empty path.
//! Names are case-sensitive and may not contain `.`.
//!
//! ## Immutability
//!
//! Nodes are never mutated after `build()`. Flag changes (`set_optional`,
//! `set_list`, `set_union`) return a new node; children are shared through
//! `Arc`, so one base schema can be reused under several flag combinations.

mod field;
mod node;

#[cfg(test)]
mod tests;

pub use field::FieldDef;
pub use node::{StructBuilder, StructDef, StructFlags};

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}
