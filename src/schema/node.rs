//! Schema nodes and the builder that validates them.
//!
//! Every way of producing a [`StructDef`] (the builder, the flag setters,
//! [`StructDef::with_flags`]) goes through the same union check, so a node
//! flagged as a union always has at least one member and no object member.

use std::sync::Arc;

use eyre::Result;
use hashbrown::HashSet;

use crate::error::StructError;
use crate::schema::field::FieldDef;
use crate::types::FieldType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StructFlags {
    pub list: bool,
    pub optional: bool,
    pub union: bool,
}

/// Immutable schema node.
///
/// A node has no knowledge of storage. It becomes a layout only through
/// [`crate::layout::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    name: String,
    fields: Vec<FieldDef>,
    children: Vec<Arc<StructDef>>,
    flags: StructFlags,
}

impl StructDef {
    pub fn builder(name: impl Into<String>) -> StructBuilder {
        StructBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn children(&self) -> &[Arc<StructDef>] {
        &self.children
    }

    pub fn flags(&self) -> StructFlags {
        self.flags
    }

    pub fn is_list(&self) -> bool {
        self.flags.list
    }

    pub fn is_optional(&self) -> bool {
        self.flags.optional
    }

    pub fn is_union(&self) -> bool {
        self.flags.union
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn child(&self, name: &str) -> Option<&Arc<StructDef>> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Returns a copy of this node marked optional. `self` is unchanged.
    pub fn set_optional(&self) -> StructDef {
        self.flagged(StructFlags {
            optional: true,
            ..self.flags
        })
    }

    /// Returns a copy of this node marked as a list. `self` is unchanged.
    pub fn set_list(&self) -> StructDef {
        self.flagged(StructFlags {
            list: true,
            ..self.flags
        })
    }

    /// Returns a copy of this node marked as a union. Fails if the node
    /// cannot be a union (no fields, or an object field).
    pub fn set_union(&self) -> Result<StructDef> {
        self.with_flags(StructFlags {
            union: true,
            ..self.flags
        })
    }

    /// Returns a copy of this node under another name, for reusing one body
    /// as several siblings.
    pub fn renamed(&self, name: impl Into<String>) -> Result<StructDef> {
        let name = name.into();
        validate_name(&name, &name)?;
        Ok(StructDef {
            name,
            ..self.clone()
        })
    }

    /// Returns a copy of this node with `flags`. Fails when the flags make
    /// it an invalid union.
    pub fn with_flags(&self, flags: StructFlags) -> Result<StructDef> {
        let node = self.flagged(flags);
        node.validate_union()?;
        Ok(node)
    }

    /// Unchecked copy. Only for flag changes that keep `union` as it was.
    pub(crate) fn flagged(&self, flags: StructFlags) -> StructDef {
        StructDef {
            name: self.name.clone(),
            fields: self.fields.clone(),
            children: self.children.clone(),
            flags,
        }
    }

    /// Number of fields in this node and all descendants, lists included.
    pub fn total_field_count(&self) -> usize {
        self.fields.len()
            + self
                .children
                .iter()
                .map(|c| c.total_field_count())
                .sum::<usize>()
    }

    /// Roots are always present and singular.
    pub fn validate_as_root(&self) -> Result<()> {
        if self.flags.list || self.flags.optional {
            return Err(StructError::schema(
                &self.name,
                "a root struct cannot be a list or optional",
            )
            .into());
        }
        Ok(())
    }

    pub(crate) fn validate_union(&self) -> Result<()> {
        if !self.flags.union {
            return Ok(());
        }
        if self.fields.is_empty() {
            return Err(StructError::schema(&self.name, "a union needs at least one field").into());
        }
        if let Some(f) = self.fields.iter().find(|f| f.field_type().is_object()) {
            return Err(StructError::schema(
                format!("{}.{}", self.name, f.name()),
                "object fields cannot be union members",
            )
            .into());
        }
        Ok(())
    }
}

pub struct StructBuilder {
    name: String,
    fields: Vec<FieldDef>,
    children: Vec<Arc<StructDef>>,
    flags: StructFlags,
}

impl StructBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            children: Vec::new(),
            flags: StructFlags::default(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type));
        self
    }

    pub fn field_def(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn child(mut self, child: impl Into<Arc<StructDef>>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn list(mut self) -> Self {
        self.flags.list = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.flags.optional = true;
        self
    }

    pub fn union(mut self) -> Self {
        self.flags.union = true;
        self
    }

    pub fn build(self) -> Result<StructDef> {
        validate_name(&self.name, &self.name)?;

        {
            let mut seen: HashSet<&str> =
                HashSet::with_capacity(self.fields.len() + self.children.len());
            for field in &self.fields {
                let path = format!("{}.{}", self.name, field.name());
                validate_name(field.name(), &path)?;
                field
                    .field_type()
                    .validate()
                    .map_err(|detail| StructError::schema(&path, detail))?;
                if !seen.insert(field.name()) {
                    return Err(StructError::schema(path, "duplicate field name").into());
                }
            }
            for child in &self.children {
                let path = format!("{}.{}", self.name, child.name());
                if !seen.insert(child.name()) {
                    return Err(StructError::schema(path, "duplicate struct name").into());
                }
            }
        }

        let node = StructDef {
            name: self.name,
            fields: self.fields,
            children: self.children,
            flags: self.flags,
        };
        node.validate_union()?;
        Ok(node)
    }
}

fn validate_name(name: &str, path: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StructError::schema(path, "names cannot be empty").into());
    }
    if name.contains('.') {
        return Err(StructError::schema(path, "names cannot contain '.'").into());
    }
    Ok(())
}
