//! # Change Listeners
//!
//! Callbacks registered on one storage, keyed either by a field or by a
//! struct ("any field under this node"). After a commit has updated the
//! buffers, every action is offered to every listener in registration order;
//! a listener runs once per action it is relevant to.
//!
//! ```text
//! ActionSet [a.x@3, a.y@3, b@0]      listeners: on_struct(a), on_field(b)
//!
//!   a.x@3 -> on_struct(a)
//!   a.y@3 -> on_struct(a)
//!   b@0   -> on_field(b)
//! ```

use tracing::trace;

use crate::layout::{CompiledSchema, FieldId, StructId};
use crate::txn::{Action, ActionSet};

pub type ListenerFn = Box<dyn FnMut(&Action) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListenTarget {
    Field(FieldId),
    Struct(StructId),
}

impl ListenTarget {
    fn matches(&self, schema: &CompiledSchema, field: FieldId) -> bool {
        match *self {
            ListenTarget::Field(id) => id == field,
            ListenTarget::Struct(id) => schema.is_within(field, id),
        }
    }
}

struct Entry {
    id: ListenerId,
    target: ListenTarget,
    callback: ListenerFn,
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl ListenerRegistry {
    pub(crate) fn register(&mut self, target: ListenTarget, callback: ListenerFn) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(Entry {
            id,
            target,
            callback,
        });
        id
    }

    /// Returns false when `id` was not registered here.
    pub(crate) fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn notify(&mut self, schema: &CompiledSchema, actions: &ActionSet) {
        if self.entries.is_empty() {
            return;
        }
        for action in actions {
            for entry in self.entries.iter_mut() {
                if entry.target.matches(schema, action.field.id) {
                    trace!(
                        target: "structstore",
                        listener = entry.id.0,
                        path = action.path(),
                        index = action.index,
                        "dispatch"
                    );
                    (entry.callback)(action);
                }
            }
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.entries.len())
            .finish()
    }
}
