//! Fuzz testing for storage operations.
//!
//! Drives a storage through arbitrary cursor moves, writes, union
//! selection, commits, rollbacks and list edits. Every accepted write must
//! be visible to the next read, and a restored snapshot must read back the
//! same committed values as its source.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use structstore::{
    compile, AlignedLayout, FieldHandle, FieldType, PackedLayout, Storage, StructDef, Value,
};

const CAPACITY: usize = 16;

#[derive(Debug, Arbitrary)]
struct StorageInput {
    aligned: bool,
    operations: Vec<StorageOperation>,
}

#[derive(Debug, Arbitrary)]
enum StorageOperation {
    Select(u8),
    WriteInt { field: u8, value: i64 },
    WriteBool(bool),
    WriteFloat(f32),
    WriteDouble(f64),
    SelectMember(u8),
    Clear,
    Commit,
    Rollback,
    Snapshot,
    ListCreate(u8),
    ListPush(i32),
    ListResize(u8),
}

fn def() -> StructDef {
    let alt = StructDef::builder("Alt")
        .field("i", FieldType::Int32)
        .field("d", FieldType::Float64)
        .field("b", FieldType::Bool)
        .union()
        .build()
        .unwrap();
    let opt = StructDef::builder("Opt")
        .field("u", FieldType::Unsigned(9))
        .optional()
        .build()
        .unwrap();
    let items = StructDef::builder("Items")
        .field("v", FieldType::Int32)
        .list()
        .build()
        .unwrap();
    StructDef::builder("Root")
        .field("a", FieldType::Int8)
        .field("b", FieldType::Int64)
        .field("c", FieldType::Unsigned(3))
        .field("flag", FieldType::Bool)
        .field("f", FieldType::Float32)
        .child(alt)
        .child(opt)
        .child(items)
        .build()
        .unwrap()
}

fn check_read(storage: &Storage, field: &FieldHandle, expected: &Value) {
    if let Ok(actual) = storage.read(field) {
        assert_eq!(&actual, expected);
    }
}

fuzz_target!(|input: StorageInput| {
    if input.operations.len() > 512 {
        return;
    }

    let schema = if input.aligned {
        compile(&def(), &AlignedLayout::words()).unwrap()
    } else {
        compile(&def(), &PackedLayout).unwrap()
    };
    let mut storage = Storage::new(schema.clone(), CAPACITY).unwrap();

    let ints: Vec<FieldHandle> = ["a", "b", "c", "Alt.i", "Opt.u"]
        .iter()
        .map(|p| storage.field(p).unwrap())
        .collect();
    let members: Vec<FieldHandle> = ["Alt.i", "Alt.d", "Alt.b"]
        .iter()
        .map(|p| storage.field(p).unwrap())
        .collect();
    let flag = storage.field("flag").unwrap();
    let f = storage.field("f").unwrap();
    let d = storage.field("Alt.d").unwrap();
    let items = storage.structure("Items").unwrap();
    let v = storage.field("Items.v").unwrap();

    for op in &input.operations {
        match op {
            StorageOperation::Select(i) => {
                let result = storage.select_structure(*i as usize);
                assert_eq!(result.is_ok(), (*i as usize) < CAPACITY);
            }
            StorageOperation::WriteInt { field, value } => {
                let h = &ints[*field as usize % ints.len()];
                if storage.write(h, *value).is_ok() {
                    check_read(&storage, h, &Value::Int(*value));
                }
            }
            StorageOperation::WriteBool(b) => {
                if storage.write(&flag, *b).is_ok() {
                    check_read(&storage, &flag, &Value::Bool(*b));
                }
            }
            StorageOperation::WriteFloat(x) => {
                if storage.write(&f, *x).is_ok() {
                    check_read(&storage, &f, &Value::Float(*x));
                }
            }
            StorageOperation::WriteDouble(x) => {
                if storage.write(&d, *x).is_ok() {
                    check_read(&storage, &d, &Value::Double(*x));
                }
            }
            StorageOperation::SelectMember(m) => {
                let h = &members[*m as usize % members.len()];
                if storage.select_union_position(h).is_ok() {
                    assert!(storage.read(h).is_ok());
                }
            }
            StorageOperation::Clear => {
                let _ = storage.clear();
            }
            StorageOperation::Commit => {
                let actions = storage.commit().unwrap();
                assert!(!storage.has_pending());
                for action in &actions {
                    assert_ne!(action.old(), action.new_value());
                }
            }
            StorageOperation::Rollback => {
                storage.rollback();
                assert_eq!(storage.pending_len(), 0);
            }
            StorageOperation::Snapshot => {
                let cursor = storage.cursor();
                let snapshot = storage.snapshot();
                let mut restored = Storage::restore(schema.clone(), &snapshot).unwrap();
                assert!(!restored.has_pending());
                for i in 0..CAPACITY {
                    storage.select_structure(i).unwrap();
                    restored.select_structure(i).unwrap();
                    for h in &ints {
                        let expected = storage.read_committed(h).ok();
                        assert_eq!(restored.read_committed(h).ok(), expected);
                    }
                }
                if let Some(i) = cursor {
                    storage.select_structure(i).unwrap();
                }
            }
            StorageOperation::ListCreate(len) => {
                let _ = storage.create_or_clear_list(&items, (*len % 32) as usize);
            }
            StorageOperation::ListPush(value) => {
                if let Ok(child) = storage.list_mut(&items) {
                    if child.push().is_ok() && child.write(&v, *value).is_ok() {
                        check_read(child, &v, &Value::Int(*value as i64));
                        child.commit().unwrap();
                    }
                }
            }
            StorageOperation::ListResize(len) => {
                if let Ok(child) = storage.list_mut(&items) {
                    let len = (*len % 64) as usize;
                    if child.resize(len).is_ok() {
                        assert_eq!(child.capacity(), len);
                    }
                }
            }
        }
    }
});
