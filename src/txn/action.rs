//! # Action Sets
//!
//! An [`ActionSet`] is the delta of exactly one commit: one [`Action`] per
//! (field, index) whose committed value changed, in the order the slot was
//! first written inside the transaction. `old` is the value before the
//! transaction and `new` the value after it, however many writes happened in
//! between. Slots written back to their original value are omitted.

use std::sync::Arc;

use crate::layout::FieldHandle;
use crate::types::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub(crate) field: FieldHandle,
    pub(crate) path: Arc<str>,
    pub(crate) index: usize,
    pub(crate) old: Value,
    pub(crate) new: Value,
}

impl Action {
    pub fn field(&self) -> FieldHandle {
        self.field
    }

    /// Dotted path of the field, relative to its schema root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn old(&self) -> &Value {
        &self.old
    }

    pub fn new_value(&self) -> &Value {
        &self.new
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionSet {
    actions: Vec<Action>,
}

impl ActionSet {
    pub(crate) fn from_actions(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Action> {
        self.actions.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    /// Actions touching `field`, at any index.
    pub fn for_field(&self, field: FieldHandle) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(move |a| a.field == field)
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl IntoIterator for ActionSet {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}
