//! # Layout Compilation
//!
//! Turns a schema tree into concrete bit offsets. Every strategy satisfies
//! the same contract; only density differs.
//!
//! ## Offset Contract
//!
//! 1. Two non-union fields of one struct body never overlap.
//! 2. Union members share the region start; each member's width is at most
//!    the region width, and nothing outside the group overlaps the region.
//! 3. A plain child's body lies entirely within its parent's stride.
//! 4. An optional child costs its parent one presence slot; its body lives in
//!    a separate segment of `capacity × child_stride`.
//! 5. A list child costs its parent nothing; its element layout is a
//!    separate compiled schema.
//!
//! ## Module Structure
//!
//! - `strategy`: `LayoutStrategy` with `PackedLayout` and `AlignedLayout`
//! - `compiler`: `LayoutCompiler` and the `compile` entry point
//! - `compiled`: `CompiledSchema`, node arenas and resolved handles

mod compiled;
mod compiler;
mod strategy;


pub use compiled::{
    BitSlot, CompiledField, CompiledSchema, CompiledStruct, FieldHandle, FieldId, Segment,
    SegmentId, StructHandle, StructId, UnionLayout,
};
pub(crate) use compiled::PathTarget;
pub use compiler::{compile, LayoutCompiler};
pub use strategy::{AlignedLayout, LayoutStrategy, PackedLayout};
