//! Tests for the storage module

use std::sync::{Arc, Mutex};

use super::*;
use crate::error::{error_kind, ErrorKind};
use crate::layout::{compile, AlignedLayout, CompiledSchema, LayoutStrategy, PackedLayout};
use crate::schema::StructDef;
use crate::txn::Action;
use crate::types::{FieldType, ObjectRef, Value};

fn row_def() -> StructDef {
    let shape = StructDef::builder("Shape")
        .field("wide", FieldType::Int64)
        .field("narrow", FieldType::Int8)
        .field("real", FieldType::Float64)
        .union()
        .build()
        .unwrap();
    let extra = StructDef::builder("Extra")
        .field("note", FieldType::Int32)
        .optional()
        .build()
        .unwrap();
    let items = StructDef::builder("Items")
        .field("v", FieldType::Int32)
        .field("obj", FieldType::Object)
        .list()
        .build()
        .unwrap();
    StructDef::builder("Row")
        .field("id", FieldType::Int64)
        .field("flag", FieldType::Bool)
        .field("small", FieldType::Unsigned(5))
        .field("ratio", FieldType::Float32)
        .field("payload", FieldType::Object)
        .child(shape)
        .child(extra)
        .child(items)
        .build()
        .unwrap()
}

fn schema_with(strategy: &dyn LayoutStrategy) -> Arc<CompiledSchema> {
    compile(&row_def(), strategy).unwrap()
}

fn storage(capacity: usize) -> Storage {
    Storage::new(schema_with(&PackedLayout), capacity).unwrap()
}

fn kind(result: eyre::Result<impl std::fmt::Debug>) -> Option<ErrorKind> {
    error_kind(&result.unwrap_err())
}

// ============================================================================
// Cursor and basic reads/writes
// ============================================================================

#[test]
fn reads_without_cursor_fail() {
    let s = storage(4);
    let id = s.field("id").unwrap();
    assert_eq!(kind(s.read(&id)), Some(ErrorKind::Index));
}

#[test]
fn select_outside_capacity_fails() {
    let mut s = storage(4);
    assert!(s.select_structure(3).is_ok());
    assert_eq!(kind(s.select_structure(4)), Some(ErrorKind::Index));
    assert_eq!(s.cursor(), Some(3));
}

#[test]
fn unwritten_fields_read_as_zero() {
    let mut s = storage(2);
    s.select_structure(1).unwrap();
    assert_eq!(s.read(&s.field("id").unwrap()).unwrap(), Value::Int(0));
    assert_eq!(s.read(&s.field("flag").unwrap()).unwrap(), Value::Bool(false));
    assert_eq!(s.read(&s.field("ratio").unwrap()).unwrap(), Value::Float(0.0));
    assert_eq!(s.read(&s.field("payload").unwrap()).unwrap(), Value::Object(None));
}

#[test]
fn committed_values_round_trip() {
    let mut s = storage(3);
    let id = s.field("id").unwrap();
    let flag = s.field("flag").unwrap();
    let small = s.field("small").unwrap();
    let ratio = s.field("ratio").unwrap();

    for i in 0..3 {
        s.select_structure(i).unwrap();
        s.write(&id, -(i as i64) - 1_000_000_000_000).unwrap();
        s.write(&flag, i % 2 == 0).unwrap();
        s.write(&small, i as i64 * 10 + 1).unwrap();
        s.write(&ratio, 0.5f32 * i as f32).unwrap();
    }
    s.commit().unwrap();

    for i in 0..3 {
        s.select_structure(i).unwrap();
        assert_eq!(s.read(&id).unwrap(), Value::Int(-(i as i64) - 1_000_000_000_000));
        assert_eq!(s.read(&flag).unwrap(), Value::Bool(i % 2 == 0));
        assert_eq!(s.read(&small).unwrap(), Value::Int(i as i64 * 10 + 1));
        assert_eq!(s.read(&ratio).unwrap(), Value::Float(0.5 * i as f32));
    }
}

#[test]
fn wrong_values_are_type_mismatches() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let flag = s.field("flag").unwrap();
    let small = s.field("small").unwrap();

    assert_eq!(kind(s.write(&flag, 1i32)), Some(ErrorKind::TypeMismatch));
    assert_eq!(kind(s.write(&small, 32i32)), Some(ErrorKind::TypeMismatch));
    assert_eq!(kind(s.write(&small, -1i32)), Some(ErrorKind::TypeMismatch));
    assert!(s.write(&small, 31i32).is_ok());
    assert_eq!(s.pending_len(), 1);
}

#[test]
fn handles_from_other_schemas_are_rejected() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let other = StructDef::builder("Other")
        .field("x", FieldType::Int8)
        .build()
        .unwrap();
    let other = compile(&other, &PackedLayout).unwrap();
    let foreign = other.field("x").unwrap();

    assert_eq!(kind(s.read(&foreign)), Some(ErrorKind::UnknownField));
    assert_eq!(kind(s.write(&foreign, 1i8)), Some(ErrorKind::UnknownField));
}

#[test]
fn handles_survive_recompilation() {
    let mut s = storage(1);
    let recompiled = schema_with(&PackedLayout);
    let h = recompiled.field("id").unwrap();
    s.select_structure(0).unwrap();
    s.write(&h, 9i64).unwrap();
    assert_eq!(s.read(&h).unwrap(), Value::Int(9));
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn pending_writes_are_visible_only_through_read() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let id = s.field("id").unwrap();
    s.write(&id, 5i64).unwrap();

    assert!(s.has_pending());
    assert_eq!(s.txn_state(), crate::txn::TxnState::Pending);
    assert_eq!(s.read(&id).unwrap(), Value::Int(5));
    assert_eq!(s.read_committed(&id).unwrap(), Value::Int(0));
}

#[test]
fn rollback_restores_previous_values() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let id = s.field("id").unwrap();
    s.write(&id, 1i64).unwrap();
    s.commit().unwrap();

    s.write(&id, 2i64).unwrap();
    s.write(&id, 3i64).unwrap();
    s.rollback();

    assert!(!s.has_pending());
    assert_eq!(s.read(&id).unwrap(), Value::Int(1));
    s.rollback();
    assert_eq!(s.read(&id).unwrap(), Value::Int(1));
}

#[test]
fn empty_commit_returns_empty_set() {
    let mut s = storage(1);
    let actions = s.commit().unwrap();
    assert!(actions.is_empty());
}

#[test]
fn action_set_follows_first_touch_order() {
    let mut s = storage(2);
    let id = s.field("id").unwrap();
    let flag = s.field("flag").unwrap();

    s.select_structure(1).unwrap();
    s.write(&flag, true).unwrap();
    s.select_structure(0).unwrap();
    s.write(&id, 7i64).unwrap();
    s.select_structure(1).unwrap();
    s.write(&flag, true).unwrap();

    let actions = s.commit().unwrap();
    assert_eq!(actions.len(), 2);
    let first = actions.get(0).unwrap();
    assert_eq!(first.field(), flag);
    assert_eq!(first.index(), 1);
    assert_eq!(first.path(), "flag");
    assert_eq!(first.old(), &Value::Bool(false));
    assert_eq!(first.new_value(), &Value::Bool(true));
    let second = actions.get(1).unwrap();
    assert_eq!(second.field(), id);
    assert_eq!(second.index(), 0);
    assert_eq!(actions.for_field(id).count(), 1);
}

#[test]
fn writes_back_to_the_old_value_are_omitted() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let id = s.field("id").unwrap();
    s.write(&id, 4i64).unwrap();
    s.write(&id, 0i64).unwrap();
    assert!(s.commit().unwrap().is_empty());
}

// ============================================================================
// Unions
// ============================================================================

#[test]
fn union_members_alias_the_same_bits() {
    let mut s = storage(2);
    s.select_structure(0).unwrap();
    let wide = s.field("Shape.wide").unwrap();
    let narrow = s.field("Shape.narrow").unwrap();

    s.write(&wide, -2i64).unwrap();
    assert_eq!(s.read(&narrow).unwrap(), Value::Int(-2));
    s.commit().unwrap();
    assert_eq!(s.read(&narrow).unwrap(), Value::Int(-2));

    s.write(&narrow, 5i8).unwrap();
    assert_eq!(s.read(&wide).unwrap(), Value::Int(-251));
    s.commit().unwrap();
    assert_eq!(s.read(&wide).unwrap(), Value::Int(-251));
}

#[test]
fn unselected_union_read_fails() {
    let mut s = storage(2);
    s.select_structure(1).unwrap();
    let narrow = s.field("Shape.narrow").unwrap();
    assert_eq!(kind(s.read(&narrow)), Some(ErrorKind::UnselectedUnion));
}

#[test]
fn explicit_selection_reinterprets_without_writing() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let shape = s.structure("Shape").unwrap();
    let wide = s.field("Shape.wide").unwrap();
    let real = s.field("Shape.real").unwrap();

    s.write(&wide, 1.5f64.to_bits() as i64).unwrap();
    s.commit().unwrap();
    assert_eq!(s.active_member(&shape).unwrap(), Some(wide));

    s.select_union_position(&real).unwrap();
    assert_eq!(s.active_member(&shape).unwrap(), Some(real));
    let actions = s.commit().unwrap();
    assert!(actions.is_empty());
    assert_eq!(s.read(&real).unwrap(), Value::Double(1.5));
}

#[test]
fn selecting_a_plain_field_is_a_mismatch() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let id = s.field("id").unwrap();
    assert_eq!(kind(s.select_union_position(&id)), Some(ErrorKind::TypeMismatch));
}

#[test]
fn clear_resets_active_interpretation() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let shape = s.structure("Shape").unwrap();
    let narrow = s.field("Shape.narrow").unwrap();
    let id = s.field("id").unwrap();

    s.write(&id, 11i64).unwrap();
    s.write(&narrow, 3i8).unwrap();
    s.commit().unwrap();

    s.clear().unwrap();
    assert_eq!(kind(s.read(&narrow)), Some(ErrorKind::UnselectedUnion));
    assert_eq!(s.read_committed(&narrow).unwrap(), Value::Int(3));
    s.commit().unwrap();

    assert_eq!(kind(s.read(&narrow)), Some(ErrorKind::UnselectedUnion));
    assert_eq!(s.active_member(&shape).unwrap(), None);
    assert_eq!(s.read(&id).unwrap(), Value::Int(11));

    s.select_union_position(&narrow).unwrap();
    assert_eq!(s.read(&narrow).unwrap(), Value::Int(3));
}

#[test]
fn clear_without_any_union_fails() {
    let plain = StructDef::builder("Plain")
        .field("a", FieldType::Int8)
        .build()
        .unwrap();
    let mut s = Storage::new(compile(&plain, &PackedLayout).unwrap(), 1).unwrap();
    s.select_structure(0).unwrap();
    assert_eq!(kind(s.clear()), Some(ErrorKind::UnselectedUnion));
}

#[test]
fn rollback_forgets_uncommitted_union_selection() {
    let alt = StructDef::builder("Alt")
        .field("n", FieldType::Int32)
        .field("m", FieldType::Int16)
        .union()
        .build()
        .unwrap();
    let root = StructDef::builder("Root")
        .field("id", FieldType::Int8)
        .child(alt)
        .build()
        .unwrap();
    let mut s = Storage::new(compile(&root, &PackedLayout).unwrap(), 1).unwrap();
    s.select_structure(0).unwrap();
    let n = s.field("Alt.n").unwrap();

    s.select_union_position(&n).unwrap();
    s.rollback();
    assert_eq!(kind(s.clear()), Some(ErrorKind::UnselectedUnion));
    assert!(!s.has_pending());

    s.write(&n, 4i32).unwrap();
    s.commit().unwrap();
    s.write(&n, 5i32).unwrap();
    s.rollback();
    s.clear().unwrap();
    s.commit().unwrap();
    assert_eq!(kind(s.read(&n)), Some(ErrorKind::UnselectedUnion));
}

#[test]
fn clear_union_targets_one_union() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let shape = s.structure("Shape").unwrap();
    let extra = s.structure("Extra").unwrap();
    let wide = s.field("Shape.wide").unwrap();

    s.write(&wide, 1i64).unwrap();
    s.clear_union(&shape).unwrap();
    assert_eq!(kind(s.read(&wide)), Some(ErrorKind::UnselectedUnion));
    assert_eq!(kind(s.clear_union(&extra)), Some(ErrorKind::TypeMismatch));
}

// ============================================================================
// Optional children
// ============================================================================

#[test]
fn absent_optional_read_fails() {
    let mut s = storage(2);
    s.select_structure(0).unwrap();
    let note = s.field("Extra.note").unwrap();
    let extra = s.structure("Extra").unwrap();

    assert_eq!(kind(s.read(&note)), Some(ErrorKind::AbsentChild));
    assert!(!s.is_present(&extra).unwrap());
}

#[test]
fn write_marks_optional_present() {
    let mut s = storage(2);
    s.select_structure(0).unwrap();
    let note = s.field("Extra.note").unwrap();
    let extra = s.structure("Extra").unwrap();

    s.write(&note, 7i32).unwrap();
    assert!(s.is_present(&extra).unwrap());
    assert_eq!(s.read(&note).unwrap(), Value::Int(7));
    assert_eq!(kind(s.read_committed(&note)), Some(ErrorKind::AbsentChild));

    s.rollback();
    assert_eq!(kind(s.read(&note)), Some(ErrorKind::AbsentChild));

    s.write(&note, 7i32).unwrap();
    s.commit().unwrap();
    assert_eq!(s.read_committed(&note).unwrap(), Value::Int(7));

    s.select_structure(1).unwrap();
    assert_eq!(kind(s.read(&note)), Some(ErrorKind::AbsentChild));
}

#[test]
fn is_present_requires_an_optional() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let shape = s.structure("Shape").unwrap();
    assert_eq!(kind(s.is_present(&shape)), Some(ErrorKind::TypeMismatch));
}

#[test]
fn nested_optionals_gate_outermost_first() {
    let inner = StructDef::builder("Inner")
        .field("x", FieldType::Int16)
        .optional()
        .build()
        .unwrap();
    let outer = StructDef::builder("Outer")
        .field("y", FieldType::Int16)
        .child(inner)
        .optional()
        .build()
        .unwrap();
    let root = StructDef::builder("Root").child(outer).build().unwrap();
    let mut s = Storage::new(compile(&root, &PackedLayout).unwrap(), 1).unwrap();
    s.select_structure(0).unwrap();
    let x = s.field("Outer.Inner.x").unwrap();
    let y = s.field("Outer.y").unwrap();

    let err = s.read(&x).unwrap_err();
    assert!(err.to_string().contains("'Outer'"));

    s.write(&x, 3i16).unwrap();
    s.commit().unwrap();
    assert_eq!(s.read(&x).unwrap(), Value::Int(3));
    assert_eq!(s.read(&y).unwrap(), Value::Int(0));
}

// ============================================================================
// Lists
// ============================================================================

#[test]
fn list_before_creation_is_not_found() {
    let mut s = storage(4);
    s.select_structure(3).unwrap();
    let items = s.structure("Items").unwrap();
    assert_eq!(kind(s.list(&items)), Some(ErrorKind::NotFound));
    assert_eq!(kind(s.list_len(&items)), Some(ErrorKind::NotFound));
}

#[test]
fn list_children_are_independent_per_parent() {
    let mut s = storage(5);
    let items = s.structure("Items").unwrap();
    let v = s.field("Items.v").unwrap();

    s.select_structure(3).unwrap();
    {
        let child = s.create_or_clear_list(&items, 0).unwrap();
        for i in 0..10 {
            let at = child.push().unwrap();
            assert_eq!(at, i);
            child.write(&v, i as i32 * 10).unwrap();
        }
        child.commit().unwrap();
    }
    s.select_structure(4).unwrap();
    s.create_or_clear_list(&items, 2).unwrap();

    s.select_structure(3).unwrap();
    assert_eq!(s.list_len(&items).unwrap(), 10);
    let child = s.list_mut(&items).unwrap();
    for i in 0..10 {
        child.select_structure(i).unwrap();
        assert_eq!(child.read(&v).unwrap(), Value::Int(i as i64 * 10));
    }

    s.select_structure(4).unwrap();
    let other = s.list_mut(&items).unwrap();
    assert_eq!(other.capacity(), 2);
    other.select_structure(1).unwrap();
    assert_eq!(other.read(&v).unwrap(), Value::Int(0));
}

#[test]
fn create_or_clear_truncates_existing_child() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let items = s.structure("Items").unwrap();
    let v = s.field("Items.v").unwrap();

    let child = s.create_or_clear_list(&items, 3).unwrap();
    child.select_structure(2).unwrap();
    child.write(&v, 9i32).unwrap();
    child.commit().unwrap();

    let child = s.create_or_clear_list(&items, 3).unwrap();
    assert_eq!(child.cursor(), None);
    child.select_structure(2).unwrap();
    assert_eq!(child.read(&v).unwrap(), Value::Int(0));
}

#[test]
fn root_storages_do_not_grow() {
    let mut s = storage(2);
    assert_eq!(kind(s.push()), Some(ErrorKind::Index));
    assert_eq!(kind(s.resize(3)), Some(ErrorKind::Index));
    assert_eq!(s.capacity(), 2);
}

#[test]
fn non_list_handle_is_a_mismatch() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let extra = s.structure("Extra").unwrap();
    assert_eq!(
        kind(s.create_or_clear_list(&extra, 1)),
        Some(ErrorKind::TypeMismatch)
    );
}

#[test]
fn commit_after_truncation_fails_atomically() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let items = s.structure("Items").unwrap();
    let v = s.field("Items.v").unwrap();

    let child = s.create_or_clear_list(&items, 5).unwrap();
    child.select_structure(0).unwrap();
    child.write(&v, 1i32).unwrap();
    child.select_structure(4).unwrap();
    child.write(&v, 2i32).unwrap();
    child.resize(2).unwrap();
    assert_eq!(child.cursor(), None);

    assert_eq!(kind(child.commit()), Some(ErrorKind::Index));
    assert!(child.has_pending());
    child.select_structure(0).unwrap();
    assert_eq!(child.read_committed(&v).unwrap(), Value::Int(0));

    child.rollback();
    assert!(child.commit().unwrap().is_empty());
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn object_fields_keep_identity() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let payload = s.field("payload").unwrap();
    let obj: ObjectRef = Arc::new(String::from("hello"));

    s.write(&payload, obj.clone()).unwrap();
    let actions = s.commit().unwrap();
    assert_eq!(actions.len(), 1);

    let value = s.read(&payload).unwrap();
    assert!(Arc::ptr_eq(value.as_object().unwrap(), &obj));
    assert_eq!(value.downcast_object::<String>().map(String::as_str), Some("hello"));

    s.write(&payload, obj.clone()).unwrap();
    assert!(s.commit().unwrap().is_empty());

    s.write(&payload, Value::Object(None)).unwrap();
    let actions = s.commit().unwrap();
    assert_eq!(actions.get(0).unwrap().new_value(), &Value::Object(None));
    assert_eq!(s.snapshot().live_objects(), 0);
}

// ============================================================================
// Listeners
// ============================================================================

fn recorder() -> (Arc<Mutex<Vec<Action>>>, impl FnMut(&Action) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |a: &Action| sink.lock().unwrap().push(a.clone()))
}

#[test]
fn listener_sees_net_change_once() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let id = s.field("id").unwrap();
    s.write(&id, 1i64).unwrap();
    s.commit().unwrap();

    let (seen, callback) = recorder();
    s.on_field(&id, callback).unwrap();
    s.write(&id, 2i64).unwrap();
    s.write(&id, 3i64).unwrap();
    s.commit().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].old(), &Value::Int(1));
    assert_eq!(seen[0].new_value(), &Value::Int(3));
}

#[test]
fn struct_listener_covers_descendants_only() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let extra = s.structure("Extra").unwrap();
    let note = s.field("Extra.note").unwrap();
    let id = s.field("id").unwrap();

    let (seen, callback) = recorder();
    s.on_struct(&extra, callback).unwrap();
    s.write(&id, 1i64).unwrap();
    s.write(&note, 2i32).unwrap();
    s.commit().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path(), "Extra.note");
}

#[test]
fn listeners_are_silent_on_rollback_and_after_unlisten() {
    let mut s = storage(1);
    s.select_structure(0).unwrap();
    let id = s.field("id").unwrap();

    let (seen, callback) = recorder();
    let handle = s.listen("id", callback).unwrap();
    s.write(&id, 1i64).unwrap();
    s.rollback();
    assert!(seen.lock().unwrap().is_empty());

    assert!(s.unlisten(handle));
    assert!(!s.unlisten(handle));
    assert_eq!(s.listener_count(), 0);
    s.write(&id, 1i64).unwrap();
    s.commit().unwrap();
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn listen_rejects_unknown_and_list_paths() {
    let mut s = storage(1);
    assert_eq!(kind(s.listen("nope", |_| {})), Some(ErrorKind::UnknownField));
    assert_eq!(kind(s.listen("Items.v", |_| {})), Some(ErrorKind::UnknownField));
    assert!(s.listen("Shape", |_| {}).is_ok());
    assert!(s.listen("", |_| {}).is_ok());
}

#[test]
fn listeners_on_list_structs_are_rejected() {
    let mut s = storage(1);
    let items = s.structure("Items").unwrap();
    assert_eq!(kind(s.listen("Items", |_| {})), Some(ErrorKind::TypeMismatch));
    assert_eq!(kind(s.on_struct(&items, |_| {})), Some(ErrorKind::TypeMismatch));
    assert_eq!(s.listener_count(), 0);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn snapshot_restores_committed_state() {
    let schema = schema_with(&AlignedLayout::bytes());
    let mut s = Storage::new(Arc::clone(&schema), 3).unwrap();
    let id = s.field("id").unwrap();
    let note = s.field("Extra.note").unwrap();
    let items = s.structure("Items").unwrap();
    let v = s.field("Items.v").unwrap();

    s.select_structure(2).unwrap();
    s.write(&id, 77i64).unwrap();
    s.write(&note, -5i32).unwrap();
    s.commit().unwrap();
    let child = s.create_or_clear_list(&items, 1).unwrap();
    child.select_structure(0).unwrap();
    child.write(&v, 12i32).unwrap();
    child.commit().unwrap();

    s.write(&id, 78i64).unwrap();
    let snap = s.snapshot();
    assert_eq!(snap.capacity(), 3);
    assert_eq!(snap.row_stride_bits(), schema.row_stride_bits());
    assert_eq!(snap.segment_count(), 2);
    assert!(snap.list(items.id(), 2).is_some());

    let mut restored = Storage::restore(Arc::clone(&schema), &snap).unwrap();
    restored.select_structure(2).unwrap();
    assert_eq!(restored.read(&id).unwrap(), Value::Int(77));
    assert_eq!(restored.read(&note).unwrap(), Value::Int(-5));
    let child = restored.list_mut(&items).unwrap();
    child.select_structure(0).unwrap();
    assert_eq!(child.read(&v).unwrap(), Value::Int(12));
    assert!(child.is_growable());
}

#[test]
fn snapshot_rejects_other_layouts() {
    let s = storage(2);
    let snap = s.snapshot();
    let err = Storage::restore(schema_with(&AlignedLayout::words()), &snap).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Compilation));
}

#[test]
fn snapshot_header_round_trips() {
    let s = storage(2);
    let snap = s.snapshot();
    let mut bytes = [0u8; SNAPSHOT_HEADER_SIZE];
    snap.header().write_to(&mut bytes).unwrap();

    let header = SnapshotHeader::from_bytes(&bytes).unwrap();
    assert_eq!(header.fingerprint(), snap.fingerprint());
    assert_eq!(header.capacity(), 2);
    assert_eq!(header.segment_count(), 2);
    assert_eq!(header.list_count(), 0);

    bytes[0] = b'X';
    assert!(SnapshotHeader::from_bytes(&bytes).is_err());
}
