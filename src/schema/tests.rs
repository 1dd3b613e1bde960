//! Tests for the schema module

use super::*;
use crate::error::{error_kind, ErrorKind};
use crate::types::FieldType;

fn point() -> StructDef {
    StructDef::builder("Point")
        .field("x", FieldType::Int32)
        .field("y", FieldType::Int32)
        .build()
        .unwrap()
}

#[test]
fn builder_keeps_declaration_order() {
    let root = StructDef::builder("Root")
        .field("b", FieldType::Bool)
        .field("a", FieldType::Int64)
        .child(point())
        .build()
        .unwrap();

    let names: Vec<_> = root.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["b", "a"]);
    assert_eq!(root.children()[0].name(), "Point");
    assert_eq!(root.flags(), StructFlags::default());
}

#[test]
fn duplicate_field_names_are_rejected() {
    let err = StructDef::builder("Root")
        .field("a", FieldType::Int32)
        .field("a", FieldType::Int64)
        .build()
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));
    assert!(err.to_string().contains("Root.a"));
}

#[test]
fn duplicate_sibling_structs_are_rejected() {
    let err = StructDef::builder("Root")
        .child(point())
        .child(point())
        .build()
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));
}

#[test]
fn field_and_child_share_a_namespace() {
    let err = StructDef::builder("Root")
        .field("Point", FieldType::Int32)
        .child(point())
        .build()
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));
}

#[test]
fn same_name_in_different_bodies_is_fine() {
    let inner = StructDef::builder("Inner")
        .field("x", FieldType::Int8)
        .build()
        .unwrap();
    let root = StructDef::builder("Root")
        .field("x", FieldType::Int8)
        .child(inner)
        .build();
    assert!(root.is_ok());
}

#[test]
fn dotted_names_are_rejected() {
    let err = StructDef::builder("Root")
        .field("a.b", FieldType::Int32)
        .build()
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));
}

#[test]
fn set_optional_returns_new_node() {
    let base = point();
    let opt = base.set_optional();

    assert!(opt.is_optional());
    assert!(!base.is_optional());
    assert_eq!(opt.fields(), base.fields());
}

#[test]
fn flag_builders_compose() {
    let base = point();
    let both = base.set_list().set_optional();
    assert!(both.is_list());
    assert!(both.is_optional());
    assert!(!base.is_list());
}

#[test]
fn one_template_reused_under_several_flags() {
    let base = point();
    let root = StructDef::builder("Root")
        .child(base.clone())
        .child(base.renamed("Points").unwrap().set_list())
        .build()
        .unwrap();
    assert_eq!(root.children().len(), 2);
    assert!(!root.children()[0].is_list());
    assert!(root.children()[1].is_list());
}

#[test]
fn root_cannot_be_list_or_optional() {
    assert!(point().validate_as_root().is_ok());

    let err = point().set_list().validate_as_root().unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));

    let err = point().set_optional().validate_as_root().unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));
}

#[test]
fn union_rejects_object_members() {
    let err = StructDef::builder("U")
        .field("n", FieldType::Int32)
        .field("o", FieldType::Object)
        .union()
        .build()
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));

    let plain = StructDef::builder("U")
        .field("o", FieldType::Object)
        .build()
        .unwrap();
    assert!(plain.set_union().is_err());
}

#[test]
fn with_flags_validates_unions() {
    let mixed = StructDef::builder("U")
        .field("n", FieldType::Int32)
        .field("o", FieldType::Object)
        .build()
        .unwrap();
    let err = mixed
        .with_flags(StructFlags {
            union: true,
            ..StructFlags::default()
        })
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));

    let optional = mixed
        .with_flags(StructFlags {
            optional: true,
            ..StructFlags::default()
        })
        .unwrap();
    assert!(optional.is_optional());
    assert!(!mixed.is_optional());
}

#[test]
fn union_needs_a_field() {
    let err = StructDef::builder("U").union().build().unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));
}

#[test]
fn unsigned_width_is_checked_at_build() {
    let err = StructDef::builder("Root")
        .field("bits", FieldType::Unsigned(0))
        .build()
        .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Schema));
}

#[test]
fn total_field_count_includes_descendants() {
    let root = StructDef::builder("Root")
        .field("id", FieldType::Int64)
        .child(point())
        .child(point().renamed("More").unwrap().set_list())
        .build()
        .unwrap();
    assert_eq!(root.total_field_count(), 5);
}

#[test]
fn renamed_keeps_body_and_flags() {
    let opt = point().set_optional();
    let renamed = opt.renamed("Other").unwrap();
    assert_eq!(renamed.name(), "Other");
    assert!(renamed.is_optional());
    assert_eq!(renamed.fields(), opt.fields());
    assert!(opt.renamed("").is_err());
}
