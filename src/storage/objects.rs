//! Slot table for object fields. A row stores a 1-based slot number; 0 is
//! "no object". Freed slots are reused LIFO.

use crate::config::OBJECT_SLOT_BITS;
use crate::types::{low_mask, ObjectRef};

#[derive(Clone, Default)]
pub(crate) struct ObjectTable {
    slots: Vec<Option<ObjectRef>>,
    free: Vec<u32>,
}

impl ObjectTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Returns `None` when every addressable slot is taken.
    pub(crate) fn insert(&mut self, object: ObjectRef) -> Option<u32> {
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize - 1] = Some(object);
            return Some(slot);
        }
        if self.slots.len() as u64 >= low_mask(OBJECT_SLOT_BITS) {
            return None;
        }
        self.slots.push(Some(object));
        Some(self.slots.len() as u32)
    }

    pub(crate) fn get(&self, slot: u32) -> Option<&ObjectRef> {
        if slot == 0 {
            return None;
        }
        self.slots.get(slot as usize - 1).and_then(Option::as_ref)
    }

    pub(crate) fn release(&mut self, slot: u32) {
        if slot == 0 {
            return;
        }
        if let Some(entry) = self.slots.get_mut(slot as usize - 1) {
            if entry.take().is_some() {
                self.free.push(slot);
            }
        }
    }

    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn slots(&self) -> &[Option<ObjectRef>] {
        &self.slots
    }

    /// Rebuilds a table from a slot image, recomputing the free list.
    pub(crate) fn from_slots(slots: Vec<Option<ObjectRef>>) -> Self {
        let free = slots
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i as u32 + 1)
            .collect();
        Self { slots, free }
    }
}

impl std::fmt::Debug for ObjectTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectTable")
            .field("slots", &self.slots.len())
            .field("live", &self.live())
            .finish()
    }
}
