//! # Pending Write Log
//!
//! Ordered log of staged operations plus the indexes that make
//! read-your-writes O(1):
//!
//! ```text
//! log:          [W(a,3)=1] [W(b,3)=7] [T(U,3)=2] [W(a,3)=5]
//! latest:       (a,3) -> 3    (b,3) -> 1
//! tags:         (U,3) -> 2
//! union_writes: (U,3) -> [..]      log positions, issue order
//! present:      {(Opt,3)}
//! ```
//!
//! The log is applied in issue order at commit, so later writes to the same
//! slot win. The indexes answer "what would a read see right now" without
//! scanning the log.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::layout::{FieldId, StructId};
use crate::types::{low_mask, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxnState {
    #[default]
    Idle,
    Pending,
}

#[derive(Debug, Clone)]
pub(crate) enum PendingOp {
    Write {
        field: FieldId,
        index: usize,
        width_bits: u32,
        /// Encoded payload. Always 0 for objects until the slot is assigned
        /// at commit.
        bits: u64,
        value: Value,
    },
    UnionTag {
        owner: StructId,
        index: usize,
        tag: u32,
    },
}

impl PendingOp {
    pub(crate) fn index(&self) -> usize {
        match self {
            PendingOp::Write { index, .. } | PendingOp::UnionTag { index, .. } => *index,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TransactionManager {
    log: Vec<PendingOp>,
    latest: HashMap<(FieldId, usize), usize>,
    tags: HashMap<(StructId, usize), u32>,
    union_writes: HashMap<(StructId, usize), SmallVec<[usize; 4]>>,
    present: HashSet<(StructId, usize)>,
}

impl TransactionManager {
    pub(crate) fn state(&self) -> TxnState {
        if self.log.is_empty() {
            TxnState::Idle
        } else {
            TxnState::Pending
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.log.len()
    }

    pub(crate) fn ops(&self) -> &[PendingOp] {
        &self.log
    }

    /// Stages a write. `union` names the owning union, `chain` the optional
    /// structs the write makes present.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn stage_write(
        &mut self,
        field: FieldId,
        index: usize,
        width_bits: u32,
        bits: u64,
        value: Value,
        union: Option<(StructId, u32)>,
        chain: &[StructId],
    ) {
        let pos = self.log.len();
        self.log.push(PendingOp::Write {
            field,
            index,
            width_bits,
            bits,
            value,
        });
        self.latest.insert((field, index), pos);
        if let Some((owner, tag)) = union {
            self.tags.insert((owner, index), tag);
            self.union_writes.entry((owner, index)).or_default().push(pos);
        }
        for &opt in chain {
            self.present.insert((opt, index));
        }
    }

    /// Stages a tag change without touching the region. Tag 0 clears.
    pub(crate) fn stage_tag(
        &mut self,
        owner: StructId,
        index: usize,
        tag: u32,
        chain: &[StructId],
    ) {
        self.log.push(PendingOp::UnionTag { owner, index, tag });
        self.tags.insert((owner, index), tag);
        for &opt in chain {
            self.present.insert((opt, index));
        }
    }

    pub(crate) fn latest_value(&self, field: FieldId, index: usize) -> Option<&Value> {
        let pos = *self.latest.get(&(field, index))?;
        match &self.log[pos] {
            PendingOp::Write { value, .. } => Some(value),
            PendingOp::UnionTag { .. } => None,
        }
    }

    pub(crate) fn pending_tag(&self, owner: StructId, index: usize) -> Option<u32> {
        self.tags.get(&(owner, index)).copied()
    }

    pub(crate) fn is_pending_present(&self, opt: StructId, index: usize) -> bool {
        self.present.contains(&(opt, index))
    }

    /// Layers staged union writes, in issue order, over committed region bits.
    pub(crate) fn overlay_union(&self, owner: StructId, index: usize, region: u64) -> u64 {
        let Some(positions) = self.union_writes.get(&(owner, index)) else {
            return region;
        };
        positions.iter().fold(region, |acc, &pos| match &self.log[pos] {
            PendingOp::Write {
                width_bits, bits, ..
            } => {
                let mask = low_mask(*width_bits);
                (acc & !mask) | (bits & mask)
            }
            PendingOp::UnionTag { .. } => acc,
        })
    }

    /// Drains the log for commit, leaving the manager idle.
    pub(crate) fn take(&mut self) -> Vec<PendingOp> {
        self.latest.clear();
        self.tags.clear();
        self.union_writes.clear();
        self.present.clear();
        std::mem::take(&mut self.log)
    }

    pub(crate) fn clear(&mut self) {
        self.take();
    }
}
