//! # Storage
//!
//! One [`Storage`] holds `capacity` instances of a compiled schema.
//!
//! ## Buffers
//!
//! ```text
//! segments[0]  row:       capacity × row_stride bits
//! segments[k]  optional:  capacity × stride(k) bits, same index as the row
//! objects      slot table for object fields
//! lists        (list struct, parent index) -> Storage, created on demand
//! ```
//!
//! A field of instance `i` lives at `i × stride(segment) + field.offset` in
//! its segment; reads and writes through a resolved handle are O(1).
//!
//! ## Visibility
//!
//! | Call | Sees |
//! |------|------|
//! | `read` | committed state with this storage's pending writes layered on top |
//! | `read_committed` | committed state only |
//!
//! Optional presence and union tags follow the same rule: a pending write
//! under an optional child already makes it present for `read`.
//!
//! ## Lists
//!
//! List structure changes (`create_or_clear_list`, `push`, `resize`) are
//! applied immediately and are not part of the pending log. Each list child
//! is a full storage with its own cursor, log and listeners; commit it on its
//! own. A root storage has a fixed capacity; only list children grow.

use std::sync::Arc;

use eyre::Result;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::{LIST_MIN_RESERVE, OBJECT_SLOT_BITS};
use crate::error::StructError;
use crate::layout::{
    CompiledField, CompiledSchema, CompiledStruct, FieldHandle, FieldId, PathTarget, StructHandle,
    StructId,
};
use crate::storage::bits::BitBuffer;
use crate::storage::objects::ObjectTable;
use crate::storage::StorageBuilder;
use crate::txn::{
    Action, ActionSet, ListenTarget, ListenerId, ListenerRegistry, PendingOp,
    TransactionManager, TxnState,
};
use crate::types::{low_mask, FieldType, Value};

pub struct Storage {
    pub(super) schema: Arc<CompiledSchema>,
    pub(super) capacity: usize,
    pub(super) growable: bool,
    pub(super) segments: Vec<BitBuffer>,
    pub(super) objects: ObjectTable,
    pub(super) lists: HashMap<(StructId, usize), Storage>,
    cursor: Option<usize>,
    txn: TransactionManager,
    listeners: ListenerRegistry,
    /// Union `clear()` acts on: the last one written or selected.
    active_union: Option<StructId>,
    /// `active_union` as of the last commit, restored by rollback.
    committed_union: Option<StructId>,
}

impl Storage {
    /// Fixed-capacity storage with default options.
    pub fn new(schema: Arc<CompiledSchema>, capacity: usize) -> Result<Self> {
        Self::allocate(schema, capacity, false, 0)
    }

    pub fn builder(schema: Arc<CompiledSchema>) -> StorageBuilder {
        StorageBuilder::new(schema)
    }

    pub(crate) fn allocate(
        schema: Arc<CompiledSchema>,
        capacity: usize,
        growable: bool,
        object_slots: usize,
    ) -> Result<Self> {
        let mut segments = Vec::with_capacity(schema.segments().len());
        for seg in schema.segments() {
            segments.push(BitBuffer::zeroed(segment_bits(&schema, capacity, seg.stride_bits)?));
        }
        debug!(
            target: "structstore",
            schema = schema.fingerprint(),
            capacity,
            growable,
            segments = segments.len(),
            "storage created"
        );
        Ok(Self {
            schema,
            capacity,
            growable,
            segments,
            objects: ObjectTable::with_capacity(object_slots),
            lists: HashMap::new(),
            cursor: None,
            txn: TransactionManager::default(),
            listeners: ListenerRegistry::default(),
            active_union: None,
            committed_union: None,
        })
    }

    pub(super) fn from_parts(
        schema: Arc<CompiledSchema>,
        capacity: usize,
        growable: bool,
        segments: Vec<BitBuffer>,
        objects: ObjectTable,
        lists: HashMap<(StructId, usize), Storage>,
    ) -> Self {
        Self {
            schema,
            capacity,
            growable,
            segments,
            objects,
            lists,
            cursor: None,
            txn: TransactionManager::default(),
            listeners: ListenerRegistry::default(),
            active_union: None,
            committed_union: None,
        }
    }

    pub fn schema(&self) -> &Arc<CompiledSchema> {
        &self.schema
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_growable(&self) -> bool {
        self.growable
    }

    pub fn row_stride_bits(&self) -> u64 {
        self.schema.row_stride_bits()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn txn_state(&self) -> TxnState {
        self.txn.state()
    }

    pub fn has_pending(&self) -> bool {
        self.txn.state() == TxnState::Pending
    }

    pub fn pending_len(&self) -> usize {
        self.txn.len()
    }

    /// Moves the cursor to instance `index`.
    pub fn select_structure(&mut self, index: usize) -> Result<()> {
        if index >= self.capacity {
            return Err(StructError::Index {
                index,
                capacity: self.capacity,
            }
            .into());
        }
        self.cursor = Some(index);
        Ok(())
    }

    pub fn field(&self, path: &str) -> Result<FieldHandle> {
        self.schema.field(path)
    }

    pub fn field_of_type(&self, path: &str, expected: FieldType) -> Result<FieldHandle> {
        self.schema.field_of_type(path, expected)
    }

    pub fn structure(&self, path: &str) -> Result<StructHandle> {
        self.schema.structure(path)
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Reads `field` at the cursor, seeing this storage's pending writes.
    pub fn read(&self, field: &FieldHandle) -> Result<Value> {
        let index = self.require_cursor()?;
        let f = self.resolve_field(field)?;
        self.read_at(f, index, true)
    }

    /// Reads `field` at the cursor from committed state only.
    pub fn read_committed(&self, field: &FieldHandle) -> Result<Value> {
        let index = self.require_cursor()?;
        let f = self.resolve_field(field)?;
        self.read_at(f, index, false)
    }

    /// True when `optional` and every optional above it are present at the
    /// cursor, counting pending writes.
    pub fn is_present(&self, optional: &StructHandle) -> Result<bool> {
        let index = self.require_cursor()?;
        let s = self.resolve_struct(optional)?;
        if !s.flags().optional || s.is_list() {
            return Err(StructError::mismatch(s.path(), "optional struct", "struct").into());
        }
        Ok(self.first_absent(s, index, true).is_none())
    }

    /// Currently selected member of `union` at the cursor, if any.
    pub fn active_member(&self, union: &StructHandle) -> Result<Option<FieldHandle>> {
        let index = self.require_cursor()?;
        let s = self.resolve_struct(union)?;
        let Some(layout) = s.union_layout() else {
            return Err(StructError::mismatch(s.path(), "union struct", "struct").into());
        };
        let tag = self.current_tag(s, index, true);
        Ok(tag
            .checked_sub(1)
            .and_then(|i| layout.members.get(i as usize))
            .map(|&id| self.handle_for(id)))
    }

    fn read_at(&self, f: &CompiledField, index: usize, pending: bool) -> Result<Value> {
        let owner = &self.schema.structs()[f.owner()];
        if let Some(absent) = self.first_absent(owner, index, pending) {
            return Err(StructError::AbsentChild {
                path: self.schema.structs()[absent].path().to_string(),
                index,
            }
            .into());
        }

        if let Some(layout) = owner.union_layout() {
            if self.current_tag(owner, index, pending) == 0 {
                return Err(StructError::UnselectedUnion {
                    path: owner.path().to_string(),
                    index,
                }
                .into());
            }
            let base = self.base(f.segment(), index);
            let mut region =
                self.segments[f.segment()].get(base + layout.offset_bits, layout.width_bits);
            if pending {
                region = self.txn.overlay_union(owner.id(), index, region);
            }
            return Ok(f.field_type().decode(region));
        }

        if pending {
            if let Some(value) = self.txn.latest_value(f.id(), index) {
                return Ok(value.clone());
            }
        }
        Ok(self.committed_value(f, index))
    }

    /// Committed value of a slot, ignoring presence and union tags.
    fn committed_value(&self, f: &CompiledField, index: usize) -> Value {
        let bits = self.segments[f.segment()].get(self.field_offset(f, index), f.width_bits());
        match f.field_type() {
            FieldType::Object => Value::Object(self.objects.get(bits as u32).cloned()),
            ty => ty.decode(bits),
        }
    }

    fn first_absent(&self, s: &CompiledStruct, index: usize, pending: bool) -> Option<StructId> {
        s.optional_chain().iter().copied().find(|&opt| {
            let present = self.committed_presence(opt, index)
                || (pending && self.txn.is_pending_present(opt, index));
            !present
        })
    }

    fn committed_presence(&self, opt: StructId, index: usize) -> bool {
        match self.schema.structs()[opt].presence() {
            Some(slot) => {
                let at = self.base(slot.segment, index) + slot.offset_bits;
                self.segments[slot.segment].get(at, 1) == 1
            }
            None => true,
        }
    }

    fn current_tag(&self, union: &CompiledStruct, index: usize, pending: bool) -> u32 {
        if pending {
            if let Some(tag) = self.txn.pending_tag(union.id(), index) {
                return tag;
            }
        }
        match union.union_layout() {
            Some(layout) => {
                let at = self.base(layout.tag.segment, index) + layout.tag.offset_bits;
                self.segments[layout.tag.segment].get(at, layout.tag_bits) as u32
            }
            None => 0,
        }
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Stages a write at the cursor. Writing a union member selects it;
    /// writing under an optional child makes the child present.
    pub fn write(&mut self, field: &FieldHandle, value: impl Into<Value>) -> Result<()> {
        let index = self.require_cursor()?;
        let schema = Arc::clone(&self.schema);
        let f = self.resolve_field_in(&schema, field)?;
        let value = value.into();
        let bits = f
            .field_type()
            .encode(&value)
            .map_err(|found| StructError::mismatch(f.path(), f.field_type().name(), found))?;

        let owner = &schema.structs()[f.owner()];
        let chain: SmallVec<[StructId; 4]> = owner.optional_chain().iter().copied().collect();
        let group = f.overlap_group();
        self.txn
            .stage_write(f.id(), index, f.width_bits(), bits, value, group, &chain);
        if let Some((union, _)) = group {
            self.active_union = Some(union);
        }
        Ok(())
    }

    /// Makes `member` the active interpretation of its union at the cursor
    /// without changing the region's bits.
    pub fn select_union_position(&mut self, member: &FieldHandle) -> Result<()> {
        let index = self.require_cursor()?;
        let schema = Arc::clone(&self.schema);
        let f = self.resolve_field_in(&schema, member)?;
        let Some((union, tag)) = f.overlap_group() else {
            return Err(StructError::mismatch(f.path(), "union member", "field").into());
        };
        let chain = schema.structs()[union].optional_chain();
        self.txn.stage_tag(union, index, tag, chain);
        self.active_union = Some(union);
        Ok(())
    }

    /// Resets the active interpretation of the union most recently written or
    /// selected on this storage (or of a union root) at the cursor. The
    /// region's bits and the rest of the instance are left alone.
    pub fn clear(&mut self) -> Result<()> {
        let index = self.require_cursor()?;
        let target = self.active_union.or_else(|| {
            self.schema
                .root()
                .union_layout()
                .map(|_| self.schema.root().id())
        });
        let Some(union) = target else {
            return Err(StructError::UnselectedUnion {
                path: self.schema.root().name().to_string(),
                index,
            }
            .into());
        };
        self.stage_clear(union, index);
        Ok(())
    }

    /// Resets the active interpretation of `union` at the cursor.
    pub fn clear_union(&mut self, union: &StructHandle) -> Result<()> {
        let index = self.require_cursor()?;
        let s = self.resolve_struct(union)?;
        if s.union_layout().is_none() {
            return Err(StructError::mismatch(s.path(), "union struct", "struct").into());
        }
        let id = s.id();
        self.stage_clear(id, index);
        Ok(())
    }

    fn stage_clear(&mut self, union: StructId, index: usize) {
        let schema = Arc::clone(&self.schema);
        let chain = schema.structs()[union].optional_chain();
        self.txn.stage_tag(union, index, 0, chain);
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Applies every pending operation in issue order and notifies listeners.
    ///
    /// All operations are validated first; on failure nothing is applied and
    /// the log stays pending so the caller can inspect or roll back.
    pub fn commit(&mut self) -> Result<ActionSet> {
        if self.txn.state() == TxnState::Idle {
            return Ok(ActionSet::default());
        }
        self.validate_pending()?;

        let schema = Arc::clone(&self.schema);
        let ops = self.txn.take();

        let mut touched: Vec<(FieldId, usize)> = Vec::new();
        let mut old: HashMap<(FieldId, usize), Value> = HashMap::new();
        for op in &ops {
            if let PendingOp::Write { field, index, .. } = op {
                old.entry((*field, *index)).or_insert_with(|| {
                    touched.push((*field, *index));
                    self.committed_value(&schema.fields()[*field], *index)
                });
            }
        }

        let applied = ops.len();
        self.committed_union = self.active_union;
        for op in ops {
            self.apply(&schema, op);
        }

        let mut actions = Vec::with_capacity(touched.len());
        for key in touched {
            let f = &schema.fields()[key.0];
            let new = self.committed_value(f, key.1);
            let Some(old) = old.remove(&key) else {
                continue;
            };
            if old != new {
                actions.push(Action {
                    field: self.handle_for(f.id()),
                    path: f.path_arc(),
                    index: key.1,
                    old,
                    new,
                });
            }
        }
        let set = ActionSet::from_actions(actions);

        debug!(
            target: "structstore",
            schema = schema.fingerprint(),
            ops = applied,
            actions = set.len(),
            "commit"
        );
        self.listeners.notify(&schema, &set);
        Ok(set)
    }

    /// Discards every pending operation. Buffers and listeners are untouched;
    /// `clear()` targets the union it targeted after the last commit.
    pub fn rollback(&mut self) {
        if self.txn.state() == TxnState::Idle {
            return;
        }
        self.active_union = self.committed_union;
        debug!(
            target: "structstore",
            schema = self.schema.fingerprint(),
            ops = self.txn.len(),
            "rollback"
        );
        self.txn.clear();
    }

    fn validate_pending(&self) -> Result<()> {
        let mut object_writes = 0u64;
        for op in self.txn.ops() {
            let index = op.index();
            if index >= self.capacity {
                return Err(StructError::Index {
                    index,
                    capacity: self.capacity,
                }
                .into());
            }
            match op {
                PendingOp::Write { field, .. } => {
                    let f = &self.schema.fields()[*field];
                    self.check_extent(f.path(), f.segment(), f.offset_bits(), f.width_bits())?;
                    if f.field_type().is_object() {
                        object_writes += 1;
                    }
                }
                PendingOp::UnionTag { owner, .. } => {
                    let s = &self.schema.structs()[*owner];
                    if let Some(layout) = s.union_layout() {
                        self.check_extent(
                            s.path(),
                            layout.tag.segment,
                            layout.tag.offset_bits,
                            layout.tag_bits,
                        )?;
                    }
                }
            }
        }
        if self.objects.slots().len() as u64 + object_writes > low_mask(OBJECT_SLOT_BITS) {
            return Err(StructError::compilation(
                "",
                "object table exhausted: too many object writes in one commit",
            )
            .into());
        }
        Ok(())
    }

    fn check_extent(&self, path: &str, segment: usize, offset: u64, width: u32) -> Result<()> {
        let stride = self.schema.segments()[segment].stride_bits;
        if offset + width as u64 > stride {
            return Err(StructError::compilation(
                path,
                format!(
                    "slot at {}+{} exceeds segment stride {}",
                    offset, width, stride
                ),
            )
            .into());
        }
        Ok(())
    }

    /// Applies one validated operation. Cannot fail.
    fn apply(&mut self, schema: &CompiledSchema, op: PendingOp) {
        match op {
            PendingOp::Write {
                field,
                index,
                bits,
                value,
                ..
            } => {
                let f = &schema.fields()[field];
                let owner = &schema.structs()[f.owner()];
                self.mark_present(schema, owner, index);
                if let (Some(layout), Some((_, tag))) = (owner.union_layout(), f.overlap_group()) {
                    let at = self.base(layout.tag.segment, index) + layout.tag.offset_bits;
                    self.segments[layout.tag.segment].set(at, layout.tag_bits, tag as u64);
                }

                let at = self.field_offset(f, index);
                let bits = if f.field_type().is_object() {
                    let previous = self.segments[f.segment()].get(at, f.width_bits()) as u32;
                    self.objects.release(previous);
                    match value {
                        Value::Object(Some(obj)) => self.objects.insert(obj).unwrap_or(0) as u64,
                        _ => 0,
                    }
                } else {
                    bits
                };
                self.segments[f.segment()].set(at, f.width_bits(), bits);
            }
            PendingOp::UnionTag { owner, index, tag } => {
                let s = &schema.structs()[owner];
                self.mark_present(schema, s, index);
                if let Some(layout) = s.union_layout() {
                    let at = self.base(layout.tag.segment, index) + layout.tag.offset_bits;
                    self.segments[layout.tag.segment].set(at, layout.tag_bits, tag as u64);
                }
            }
        }
    }

    fn mark_present(&mut self, schema: &CompiledSchema, s: &CompiledStruct, index: usize) {
        for &opt in s.optional_chain() {
            if let Some(slot) = schema.structs()[opt].presence() {
                let at = self.base(slot.segment, index) + slot.offset_bits;
                self.segments[slot.segment].set(at, 1, 1);
            }
        }
    }

    // ========================================================================
    // LISTS
    // ========================================================================

    /// Creates the list child of `list` at the cursor with `len` zeroed
    /// elements, or truncates an existing one to exactly that. An existing
    /// child keeps its listeners; everything else is reset.
    pub fn create_or_clear_list(
        &mut self,
        list: &StructHandle,
        len: usize,
    ) -> Result<&mut Storage> {
        let index = self.require_cursor()?;
        let (id, element) = self.resolve_list(list)?;
        debug!(
            target: "structstore",
            list = self.schema.structs()[id].path(),
            parent = index,
            len,
            "list created or cleared"
        );
        match self.lists.entry((id, index)) {
            Entry::Occupied(entry) => {
                let child = entry.into_mut();
                child.reset(len)?;
                Ok(child)
            }
            Entry::Vacant(entry) => Ok(entry.insert(Storage::allocate(element, len, true, 0)?)),
        }
    }

    /// List child of `list` at the cursor.
    pub fn list(&self, list: &StructHandle) -> Result<&Storage> {
        let index = self.require_cursor()?;
        let (id, _) = self.resolve_list(list)?;
        self.lists
            .get(&(id, index))
            .ok_or_else(|| not_found(&self.schema, id, index))
    }

    pub fn list_mut(&mut self, list: &StructHandle) -> Result<&mut Storage> {
        let index = self.require_cursor()?;
        let (id, _) = self.resolve_list(list)?;
        let schema = &self.schema;
        self.lists
            .get_mut(&(id, index))
            .ok_or_else(|| not_found(schema, id, index))
    }

    pub fn list_len(&self, list: &StructHandle) -> Result<usize> {
        self.list(list).map(Storage::capacity)
    }

    /// Appends one zeroed element and moves the cursor to it. Only list
    /// children grow.
    pub fn push(&mut self) -> Result<usize> {
        if !self.growable {
            return Err(StructError::Index {
                index: self.capacity,
                capacity: self.capacity,
            }
            .into());
        }
        let index = self.capacity;
        for (k, seg) in self.schema.segments().iter().enumerate() {
            self.segments[k].reserve_bits(seg.stride_bits * LIST_MIN_RESERVE as u64);
        }
        self.resize(index + 1)?;
        self.cursor = Some(index);
        Ok(index)
    }

    /// Grows with zeroed elements or truncates. Truncated elements release
    /// their objects and list children; a cursor past the end is dropped.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        if !self.growable {
            return Err(StructError::Index {
                index: len,
                capacity: self.capacity,
            }
            .into());
        }
        if len < self.capacity {
            self.release_rows(len);
        }
        let schema = Arc::clone(&self.schema);
        for (k, seg) in schema.segments().iter().enumerate() {
            let bits = segment_bits(&schema, len, seg.stride_bits)?;
            self.segments[k].resize(bits);
        }
        self.capacity = len;
        if self.cursor.is_some_and(|c| c >= len) {
            self.cursor = None;
        }
        Ok(())
    }

    fn reset(&mut self, len: usize) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        for (k, seg) in schema.segments().iter().enumerate() {
            self.segments[k] = BitBuffer::zeroed(segment_bits(&schema, len, seg.stride_bits)?);
        }
        self.capacity = len;
        self.objects = ObjectTable::default();
        self.lists.clear();
        self.cursor = None;
        self.txn.clear();
        self.active_union = None;
        self.committed_union = None;
        Ok(())
    }

    fn release_rows(&mut self, from: usize) {
        let schema = Arc::clone(&self.schema);
        for f in schema.fields().iter().filter(|f| f.field_type().is_object()) {
            for index in from..self.capacity {
                let at = self.field_offset(f, index);
                let slot = self.segments[f.segment()].get(at, f.width_bits());
                self.objects.release(slot as u32);
            }
        }
        self.lists.retain(|&(_, parent), _| parent < from);
    }

    fn resolve_list(&self, list: &StructHandle) -> Result<(StructId, Arc<CompiledSchema>)> {
        let s = self.resolve_struct(list)?;
        match s.list_schema() {
            Some(element) => Ok((s.id(), Arc::clone(element))),
            None => Err(StructError::mismatch(s.path(), "list struct", "struct").into()),
        }
    }

    // ========================================================================
    // LISTENERS
    // ========================================================================

    /// Registers `callback` on a field or struct path of this storage's
    /// schema. Paths reaching into list children are rejected; register on
    /// the child storage instead.
    pub fn listen<F>(&mut self, path: &str, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&Action) + Send + 'static,
    {
        let target = match self.schema.paths.get(path) {
            Some(PathTarget::Field(id)) => ListenTarget::Field(*id),
            Some(PathTarget::Struct(id)) => {
                self.check_listenable(&self.schema.structs()[*id])?;
                ListenTarget::Struct(*id)
            }
            None => return Err(StructError::unknown(path).into()),
        };
        Ok(self.listeners.register(target, Box::new(callback)))
    }

    pub fn on_field<F>(&mut self, field: &FieldHandle, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&Action) + Send + 'static,
    {
        let id = self.resolve_field(field)?.id();
        Ok(self
            .listeners
            .register(ListenTarget::Field(id), Box::new(callback)))
    }

    pub fn on_struct<F>(&mut self, structure: &StructHandle, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&Action) + Send + 'static,
    {
        let s = self.resolve_struct(structure)?;
        self.check_listenable(s)?;
        let id = s.id();
        Ok(self
            .listeners
            .register(ListenTarget::Struct(id), Box::new(callback)))
    }

    /// A list struct owns no fields here; its elements live in the child
    /// storages, which carry their own listeners.
    fn check_listenable(&self, s: &CompiledStruct) -> Result<()> {
        if s.is_list() {
            return Err(
                StructError::mismatch(s.path(), "field or non-list struct", "list").into(),
            );
        }
        Ok(())
    }

    /// Returns false when `id` was not registered on this storage.
    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ========================================================================
    // ADDRESSING
    // ========================================================================

    fn require_cursor(&self) -> Result<usize> {
        let index = self.cursor.ok_or(StructError::NoSelection)?;
        if index >= self.capacity {
            return Err(StructError::Index {
                index,
                capacity: self.capacity,
            }
            .into());
        }
        Ok(index)
    }

    fn resolve_field(&self, handle: &FieldHandle) -> Result<&CompiledField> {
        self.resolve_field_in(&self.schema, handle)
    }

    fn resolve_field_in<'s>(
        &self,
        schema: &'s CompiledSchema,
        handle: &FieldHandle,
    ) -> Result<&'s CompiledField> {
        if handle.schema_fingerprint() != schema.fingerprint() {
            return Err(StructError::unknown(format!(
                "field #{} of schema {:016x}",
                handle.id(),
                handle.schema_fingerprint()
            ))
            .into());
        }
        schema
            .field_at(handle.id())
            .ok_or_else(|| StructError::unknown(format!("field #{}", handle.id())).into())
    }

    fn resolve_struct(&self, handle: &StructHandle) -> Result<&CompiledStruct> {
        if handle.schema_fingerprint() != self.schema.fingerprint() {
            return Err(StructError::unknown(format!(
                "struct #{} of schema {:016x}",
                handle.id(),
                handle.schema_fingerprint()
            ))
            .into());
        }
        self.schema
            .struct_at(handle.id())
            .ok_or_else(|| StructError::unknown(format!("struct #{}", handle.id())).into())
    }

    fn handle_for(&self, id: FieldId) -> FieldHandle {
        FieldHandle {
            schema: self.schema.fingerprint(),
            id,
            field_type: self.schema.fields()[id].field_type(),
        }
    }

    #[inline]
    fn base(&self, segment: usize, index: usize) -> u64 {
        index as u64 * self.schema.segments()[segment].stride_bits
    }

    #[inline]
    fn field_offset(&self, f: &CompiledField, index: usize) -> u64 {
        self.base(f.segment(), index) + f.offset_bits()
    }
}

fn not_found(schema: &CompiledSchema, id: StructId, index: usize) -> eyre::Report {
    StructError::NotFound {
        path: schema.structs()[id].path().to_string(),
        index,
    }
    .into()
}

fn segment_bits(schema: &CompiledSchema, capacity: usize, stride_bits: u64) -> Result<u64> {
    (capacity as u64).checked_mul(stride_bits).ok_or_else(|| {
        StructError::compilation(
            schema.root().name(),
            format!(
                "{} instances of {} bits overflow the addressable range",
                capacity, stride_bits
            ),
        )
        .into()
    })
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("schema", &format_args!("{:016x}", self.schema.fingerprint()))
            .field("capacity", &self.capacity)
            .field("growable", &self.growable)
            .field("cursor", &self.cursor)
            .field("pending", &self.txn.len())
            .field("lists", &self.lists.len())
            .field("objects", &self.objects)
            .field("listeners", &self.listeners)
            .finish()
    }
}
