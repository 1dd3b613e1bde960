//! # Compiled Schema
//!
//! The compiler's output: the schema tree flattened into arenas of
//! [`CompiledStruct`] and [`CompiledField`], each annotated with its segment,
//! bit offset and stride. Immutable once produced and shared through `Arc`.
//!
//! ## Segments
//!
//! Segment 0 is the row: `capacity × row_stride` bits. Every optional child
//! opens a new segment of `capacity × child_stride` bits, indexed by the same
//! instance index as the row. Plain children live inline in their parent's
//! segment. List children have no segment; they carry their own compiled
//! schema, instantiated per parent index by the storage.
//!
//! ```text
//! segment 0 (row)            segment 1 (Extra, optional)
//! +----+-------+---+------+  +--------+
//! | id | Pos.x | y | P(E) |  | note   |
//! +----+-------+---+------+  +--------+
//!   P(E) = presence bit of Extra
//! ```
//!
//! ## Handles
//!
//! Paths resolve to [`FieldHandle`] / [`StructHandle`] values carrying the
//! owning schema's fingerprint and an arena index. Resolution is by name and
//! happens once; reads and writes index the arena directly.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use eyre::Result;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::StructError;
use crate::schema::StructFlags;
use crate::types::FieldType;

pub type StructId = usize;
pub type FieldId = usize;
pub type SegmentId = usize;

/// One bit position inside a segment body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitSlot {
    pub segment: SegmentId,
    pub offset_bits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionLayout {
    pub offset_bits: u64,
    pub width_bits: u32,
    /// Active-member tag. 0 means no member was ever selected.
    pub tag: BitSlot,
    pub tag_bits: u32,
    pub members: Vec<FieldId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub owner: StructId,
    pub stride_bits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathTarget {
    Field(FieldId),
    Struct(StructId),
}

#[derive(Debug, Clone)]
pub struct CompiledStruct {
    pub(crate) id: StructId,
    pub(crate) name: String,
    pub(crate) path: Arc<str>,
    pub(crate) parent: Option<StructId>,
    pub(crate) flags: StructFlags,
    pub(crate) segment: SegmentId,
    pub(crate) offset_bits: u64,
    pub(crate) stride_bits: u64,
    pub(crate) presence: Option<BitSlot>,
    pub(crate) optional_chain: SmallVec<[StructId; 2]>,
    pub(crate) union: Option<UnionLayout>,
    pub(crate) children: Vec<StructId>,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) list_schema: Option<Arc<CompiledSchema>>,
}

impl CompiledStruct {
    pub fn id(&self) -> StructId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<StructId> {
        self.parent
    }

    pub fn flags(&self) -> StructFlags {
        self.flags
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    pub fn offset_bits(&self) -> u64 {
        self.offset_bits
    }

    pub fn stride_bits(&self) -> u64 {
        self.stride_bits
    }

    /// Presence bit of an optional child, in its parent's segment.
    pub fn presence(&self) -> Option<BitSlot> {
        self.presence
    }

    /// Optional structs that gate this one, outermost first, itself included.
    pub fn optional_chain(&self) -> &[StructId] {
        &self.optional_chain
    }

    pub fn union_layout(&self) -> Option<&UnionLayout> {
        self.union.as_ref()
    }

    pub fn children(&self) -> &[StructId] {
        &self.children
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn list_schema(&self) -> Option<&Arc<CompiledSchema>> {
        self.list_schema.as_ref()
    }

    pub fn is_list(&self) -> bool {
        self.list_schema.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub(crate) id: FieldId,
    pub(crate) name: String,
    pub(crate) path: Arc<str>,
    pub(crate) owner: StructId,
    pub(crate) field_type: FieldType,
    pub(crate) segment: SegmentId,
    pub(crate) offset_bits: u64,
    pub(crate) width_bits: u32,
    pub(crate) slot_bits: u64,
    pub(crate) union_tag: Option<u32>,
}

impl CompiledField {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn owner(&self) -> StructId {
        self.owner
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    pub fn offset_bits(&self) -> u64 {
        self.offset_bits
    }

    pub fn width_bits(&self) -> u32 {
        self.width_bits
    }

    pub fn slot_bits(&self) -> u64 {
        self.slot_bits
    }

    /// Overlap group: the owning union and this member's 1-based tag.
    pub fn overlap_group(&self) -> Option<(StructId, u32)> {
        self.union_tag.map(|tag| (self.owner, tag))
    }

    pub(crate) fn path_arc(&self) -> Arc<str> {
        Arc::clone(&self.path)
    }
}

/// Resolved, storage-independent reference to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    pub(crate) schema: u64,
    pub(crate) id: FieldId,
    pub(crate) field_type: FieldType,
}

impl FieldHandle {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn schema_fingerprint(&self) -> u64 {
        self.schema
    }
}

/// Resolved reference to a struct node (list, optional, union or plain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructHandle {
    pub(crate) schema: u64,
    pub(crate) id: StructId,
    pub(crate) flags: StructFlags,
}

impl StructHandle {
    pub fn id(&self) -> StructId {
        self.id
    }

    pub fn flags(&self) -> StructFlags {
        self.flags
    }

    pub fn schema_fingerprint(&self) -> u64 {
        self.schema
    }
}

#[derive(Debug)]
pub struct CompiledSchema {
    pub(crate) fingerprint: u64,
    pub(crate) strategy: &'static str,
    pub(crate) structs: Vec<CompiledStruct>,
    pub(crate) fields: Vec<CompiledField>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) paths: HashMap<String, PathTarget>,
}

impl CompiledSchema {
    pub(crate) fn new(
        strategy: &'static str,
        structs: Vec<CompiledStruct>,
        fields: Vec<CompiledField>,
        segments: Vec<Segment>,
        paths: HashMap<String, PathTarget>,
    ) -> Self {
        let mut schema = Self {
            fingerprint: 0,
            strategy,
            structs,
            fields,
            segments,
            paths,
        };
        schema.fingerprint = schema.compute_fingerprint();
        schema
    }

    /// Identifies the layout. Equal layouts of equal schemas have equal
    /// fingerprints, so handles stay valid across recompilation.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    pub fn root(&self) -> &CompiledStruct {
        &self.structs[0]
    }

    pub fn row_stride_bits(&self) -> u64 {
        self.segments[0].stride_bits
    }

    pub fn structs(&self) -> &[CompiledStruct] {
        &self.structs
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn struct_at(&self, id: StructId) -> Option<&CompiledStruct> {
        self.structs.get(id)
    }

    pub fn field_at(&self, id: FieldId) -> Option<&CompiledField> {
        self.fields.get(id)
    }

    /// Resolves a dotted path to a field handle.
    pub fn field(&self, path: &str) -> Result<FieldHandle> {
        let (schema, target) = self.resolve(path)?;
        match target {
            PathTarget::Field(id) => Ok(FieldHandle {
                schema: schema.fingerprint,
                id,
                field_type: schema.fields[id].field_type,
            }),
            PathTarget::Struct(_) => Err(StructError::mismatch(path, "field", "struct").into()),
        }
    }

    /// Resolves a field and checks its logical type.
    pub fn field_of_type(&self, path: &str, expected: FieldType) -> Result<FieldHandle> {
        let handle = self.field(path)?;
        if handle.field_type != expected {
            return Err(StructError::mismatch(
                path,
                expected.name(),
                handle.field_type.name(),
            )
            .into());
        }
        Ok(handle)
    }

    /// Resolves a dotted path to a struct handle. The empty path is the root.
    pub fn structure(&self, path: &str) -> Result<StructHandle> {
        let (schema, target) = self.resolve(path)?;
        match target {
            PathTarget::Struct(id) => Ok(StructHandle {
                schema: schema.fingerprint,
                id,
                flags: schema.structs[id].flags,
            }),
            PathTarget::Field(_) => Err(StructError::mismatch(path, "struct", "field").into()),
        }
    }

    /// Looks a path up in this schema, descending into list schemas when a
    /// prefix names a list child.
    pub(crate) fn resolve(&self, path: &str) -> Result<(&CompiledSchema, PathTarget)> {
        if let Some(target) = self.paths.get(path) {
            return Ok((self, *target));
        }
        for (dot, _) in path.match_indices('.') {
            let prefix = &path[..dot];
            if let Some(PathTarget::Struct(id)) = self.paths.get(prefix) {
                if let Some(list) = &self.structs[*id].list_schema {
                    return list
                        .resolve(&path[dot + 1..])
                        .map_err(|_| StructError::unknown(path).into());
                }
            }
        }
        Err(StructError::unknown(path).into())
    }

    /// True when `field` sits anywhere below `ancestor` in this schema.
    pub fn is_within(&self, field: FieldId, ancestor: StructId) -> bool {
        let mut cursor = self.fields.get(field).map(|f| f.owner);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.structs[id].parent;
        }
        false
    }

    /// Human-readable dump of the layout, one line per node.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "schema {:016x} strategy={} row_stride={}b segments={}",
            self.fingerprint,
            self.strategy,
            self.row_stride_bits(),
            self.segments.len()
        );
        self.describe_struct(0, 0, &mut out);
        out
    }

    fn describe_struct(&self, id: StructId, depth: usize, out: &mut String) {
        let s = &self.structs[id];
        let indent = "  ".repeat(depth);
        let mut tags = Vec::new();
        if s.flags.list {
            tags.push("list");
        }
        if s.flags.optional {
            tags.push("optional");
        }
        if s.flags.union {
            tags.push("union");
        }
        let _ = writeln!(
            out,
            "{}{} [{}] seg={} off={} stride={}",
            indent,
            s.name,
            tags.join(","),
            s.segment,
            s.offset_bits,
            s.stride_bits
        );
        for &fid in &s.fields {
            let f = &self.fields[fid];
            let _ = writeln!(
                out,
                "{}  .{}: {} seg={} off={} width={}{}",
                indent,
                f.name,
                f.field_type.name(),
                f.segment,
                f.offset_bits,
                f.width_bits,
                f.union_tag
                    .map(|t| format!(" tag={}", t))
                    .unwrap_or_default()
            );
        }
        for &child in &s.children {
            if let Some(list) = &self.structs[child].list_schema {
                let _ = writeln!(
                    out,
                    "{}  {} [list] -> schema {:016x}",
                    indent, self.structs[child].name, list.fingerprint
                );
                list.describe_struct(0, depth + 2, out);
            } else {
                self.describe_struct(child, depth + 1, out);
            }
        }
    }

    fn compute_fingerprint(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.strategy.hash(&mut h);
        for s in &self.structs {
            s.path.hash(&mut h);
            s.flags.hash(&mut h);
            s.segment.hash(&mut h);
            s.offset_bits.hash(&mut h);
            s.stride_bits.hash(&mut h);
            s.presence.hash(&mut h);
            if let Some(u) = &s.union {
                u.offset_bits.hash(&mut h);
                u.width_bits.hash(&mut h);
                u.tag.hash(&mut h);
            }
            if let Some(list) = &s.list_schema {
                list.fingerprint.hash(&mut h);
            }
        }
        for f in &self.fields {
            f.path.hash(&mut h);
            f.field_type.hash(&mut h);
            f.segment.hash(&mut h);
            f.offset_bits.hash(&mut h);
            f.union_tag.hash(&mut h);
        }
        for seg in &self.segments {
            seg.stride_bits.hash(&mut h);
        }
        h.finish()
    }
}
