//! # Layout Compiler
//!
//! Depth-first walk over a [`StructDef`] tree producing a [`CompiledSchema`].
//!
//! ## Body Layout
//!
//! For one struct body starting at `offset` in `segment`:
//!
//! ```text
//! plain:  | f0 | f1 | ... | P(opt0) | child0 body | P(opt1) | ...
//! union:  | region (widest member) | tag | P(opt0) | child0 body | ...
//! ```
//!
//! - Fields take one slot each, in declaration order. Union members all sit
//!   at the region start; the tag records the active member (0 = none).
//! - Children follow in declaration order:
//!   - plain child: body inlined at the running offset, stride appended;
//!   - optional child: one presence slot here, body in a fresh segment;
//!   - list child: nothing here, its body is compiled as a separate schema.
//! - The body extent is rounded by the strategy and checked against the
//!   addressable limit.
//!
//! A struct flagged both list and optional is compiled as a list: a list
//! region is already absent until created.
//!
//! Compilation is linear in the number of nodes and deterministic: the same
//! tree and strategy always give the same offsets and fingerprint.

use std::sync::Arc;

use eyre::Result;
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::{MAX_STRIDE_BITS, MAX_UNION_BITS};
use crate::error::StructError;
use crate::layout::compiled::{
    BitSlot, CompiledField, CompiledSchema, CompiledStruct, FieldId, PathTarget, Segment,
    SegmentId, StructId, UnionLayout,
};
use crate::layout::strategy::LayoutStrategy;
use crate::schema::{join_path, StructDef, StructFlags};

/// Compiles `root` with `strategy` and the default stride limit.
pub fn compile(root: &StructDef, strategy: &dyn LayoutStrategy) -> Result<Arc<CompiledSchema>> {
    LayoutCompiler::new(strategy).compile(root)
}

pub struct LayoutCompiler<'a> {
    strategy: &'a dyn LayoutStrategy,
    max_stride_bits: u64,
}

#[derive(Default)]
struct Scope {
    structs: Vec<CompiledStruct>,
    fields: Vec<CompiledField>,
    segments: Vec<Segment>,
    paths: HashMap<String, PathTarget>,
}

impl<'a> LayoutCompiler<'a> {
    pub fn new(strategy: &'a dyn LayoutStrategy) -> Self {
        Self {
            strategy,
            max_stride_bits: MAX_STRIDE_BITS,
        }
    }

    /// Lowers the addressable limit for one struct body.
    pub fn max_stride_bits(mut self, bits: u64) -> Self {
        self.max_stride_bits = bits;
        self
    }

    pub fn compile(&self, root: &StructDef) -> Result<Arc<CompiledSchema>> {
        root.validate_as_root()?;
        let schema = self.compile_scope(root)?;
        debug!(
            target: "structstore",
            root = root.name(),
            strategy = schema.strategy(),
            structs = schema.structs().len(),
            fields = schema.fields().len(),
            row_stride_bits = schema.row_stride_bits(),
            "compiled schema"
        );
        Ok(Arc::new(schema))
    }

    /// Compiles `root` as the top of an independent address space: the
    /// schema root itself, or the element type of a list.
    fn compile_scope(&self, root: &StructDef) -> Result<CompiledSchema> {
        let mut scope = Scope::default();
        scope.segments.push(Segment {
            owner: 0,
            stride_bits: 0,
        });

        let root_id = self.layout_struct(&mut scope, root, None, "", 0, 0, &SmallVec::new())?;
        scope.segments[0].stride_bits = scope.structs[root_id].stride_bits;

        Ok(CompiledSchema::new(
            self.strategy.name(),
            scope.structs,
            scope.fields,
            scope.segments,
            scope.paths,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn layout_struct(
        &self,
        scope: &mut Scope,
        def: &StructDef,
        parent: Option<StructId>,
        parent_path: &str,
        segment: SegmentId,
        offset: u64,
        chain: &SmallVec<[StructId; 2]>,
    ) -> Result<StructId> {
        let id = scope.structs.len();
        let path: Arc<str> = match parent {
            None => Arc::from(""),
            Some(_) => Arc::from(join_path(parent_path, def.name())),
        };
        let flags = match parent {
            None => StructFlags {
                union: def.is_union(),
                ..StructFlags::default()
            },
            Some(_) => def.flags(),
        };
        let mut chain = chain.clone();
        if flags.optional {
            chain.push(id);
        }

        scope.structs.push(CompiledStruct {
            id,
            name: def.name().to_string(),
            path: Arc::clone(&path),
            parent,
            flags,
            segment,
            offset_bits: offset,
            stride_bits: 0,
            presence: None,
            optional_chain: chain.clone(),
            union: None,
            children: Vec::with_capacity(def.children().len()),
            fields: Vec::with_capacity(def.fields().len()),
            list_schema: None,
        });
        scope.paths.insert(path.to_string(), PathTarget::Struct(id));

        let mut cursor = offset;
        let mut field_ids: Vec<FieldId> = Vec::with_capacity(def.fields().len());

        if flags.union {
            def.validate_union()?;
            let width = def
                .fields()
                .iter()
                .map(|f| f.width_bits())
                .max()
                .unwrap_or(0);
            if width > MAX_UNION_BITS {
                return Err(StructError::compilation(
                    &*path,
                    format!(
                        "union region of {} bits exceeds the {}-bit limit",
                        width, MAX_UNION_BITS
                    ),
                )
                .into());
            }
            let region = cursor;
            let region_slot = self.slot(&path, width)?;
            cursor += region_slot;

            let tag_bits = tag_width(def.fields().len());
            let tag = BitSlot {
                segment,
                offset_bits: cursor,
            };
            cursor += self.slot(&path, tag_bits)?;

            for (i, f) in def.fields().iter().enumerate() {
                let fid = push_field(
                    scope,
                    id,
                    &path,
                    f.name(),
                    f.field_type(),
                    segment,
                    region,
                    region_slot,
                    Some(i as u32 + 1),
                );
                field_ids.push(fid);
            }
            scope.structs[id].union = Some(UnionLayout {
                offset_bits: region,
                width_bits: width,
                tag,
                tag_bits,
                members: field_ids.clone(),
            });
        } else {
            for f in def.fields() {
                let slot = self.slot(&path, f.width_bits())?;
                let fid = push_field(
                    scope,
                    id,
                    &path,
                    f.name(),
                    f.field_type(),
                    segment,
                    cursor,
                    slot,
                    None,
                );
                field_ids.push(fid);
                cursor += slot;
            }
        }
        scope.structs[id].fields = field_ids;

        for child in def.children() {
            let child_id = if child.is_list() {
                let list_schema = Arc::new(self.compile_scope(child)?);
                let child_id = scope.structs.len();
                let child_path: Arc<str> = Arc::from(join_path(&path, child.name()));
                scope.structs.push(CompiledStruct {
                    id: child_id,
                    name: child.name().to_string(),
                    path: Arc::clone(&child_path),
                    parent: Some(id),
                    flags: child.flags(),
                    segment,
                    offset_bits: cursor,
                    stride_bits: 0,
                    presence: None,
                    optional_chain: chain.clone(),
                    union: None,
                    children: Vec::new(),
                    fields: Vec::new(),
                    list_schema: Some(list_schema),
                });
                scope
                    .paths
                    .insert(child_path.to_string(), PathTarget::Struct(child_id));
                child_id
            } else if child.is_optional() {
                let presence = BitSlot {
                    segment,
                    offset_bits: cursor,
                };
                cursor += self.slot(&path, 1)?;

                let child_segment = scope.segments.len();
                scope.segments.push(Segment {
                    owner: scope.structs.len(),
                    stride_bits: 0,
                });
                let child_id =
                    self.layout_struct(scope, child, Some(id), &path, child_segment, 0, &chain)?;
                scope.segments[child_segment].stride_bits = scope.structs[child_id].stride_bits;
                scope.structs[child_id].presence = Some(presence);
                child_id
            } else {
                let child_id =
                    self.layout_struct(scope, child, Some(id), &path, segment, cursor, &chain)?;
                cursor += scope.structs[child_id].stride_bits;
                child_id
            };
            scope.structs[id].children.push(child_id);
        }

        let extent = cursor - offset;
        let stride = self.strategy.round_stride(extent);
        if stride < extent {
            return Err(StructError::compilation(
                display_path(&path, def.name()),
                format!(
                    "strategy '{}' rounded a {}-bit body down to {} bits",
                    self.strategy.name(),
                    extent,
                    stride
                ),
            )
            .into());
        }
        if stride > self.max_stride_bits {
            return Err(StructError::compilation(
                display_path(&path, def.name()),
                format!(
                    "stride of {} bits exceeds the addressable limit of {} bits",
                    stride, self.max_stride_bits
                ),
            )
            .into());
        }
        scope.structs[id].stride_bits = stride;
        Ok(id)
    }

    fn slot(&self, path: &str, width_bits: u32) -> Result<u64> {
        let slot = self.strategy.slot_bits(width_bits);
        if slot < width_bits as u64 {
            return Err(StructError::compilation(
                path,
                format!(
                    "strategy '{}' reserved {} bits for a {}-bit slot",
                    self.strategy.name(),
                    slot,
                    width_bits
                ),
            )
            .into());
        }
        Ok(slot)
    }
}

#[allow(clippy::too_many_arguments)]
fn push_field(
    scope: &mut Scope,
    owner: StructId,
    owner_path: &str,
    name: &str,
    field_type: crate::types::FieldType,
    segment: SegmentId,
    offset_bits: u64,
    slot_bits: u64,
    union_tag: Option<u32>,
) -> FieldId {
    let id = scope.fields.len();
    let path = join_path(owner_path, name);
    scope.paths.insert(path.clone(), PathTarget::Field(id));
    scope.fields.push(CompiledField {
        id,
        name: name.to_string(),
        path: Arc::from(path),
        owner,
        field_type,
        segment,
        offset_bits,
        width_bits: field_type.width_bits(),
        slot_bits,
        union_tag,
    });
    id
}

/// Bits needed to store tags `0..=members`.
fn tag_width(members: usize) -> u32 {
    64 - (members as u64).leading_zeros()
}

fn display_path<'p>(path: &'p str, name: &'p str) -> &'p str {
    if path.is_empty() {
        name
    } else {
        path
    }
}
