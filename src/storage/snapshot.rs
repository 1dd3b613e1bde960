//! # Snapshots
//!
//! A [`StorageSnapshot`] is a detached copy of a storage's committed state:
//! raw segment bytes, the object table and every list child, recursively.
//! Pending writes, the cursor and listeners are not captured.
//!
//! Segment images are little-endian `u64` words, so the byte image is stable
//! across hosts. The fixed-size [`SnapshotHeader`] describes an image:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       8     magic "SSTORE01"
//! 8       8     layout fingerprint
//! 16      8     capacity (instances)
//! 24      8     row stride (bits)
//! 32      4     segment count
//! 36      4     list child count
//! ```
//!
//! Restoring checks the fingerprint against the target schema; a snapshot
//! only restores into a storage of the identical layout.

use std::sync::Arc;

use eyre::{ensure, Result};
use hashbrown::HashMap;
use zerocopy::byteorder::{LittleEndian, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::SNAPSHOT_MAGIC;
use crate::error::StructError;
use crate::layout::{CompiledSchema, StructId};
use crate::storage::bits::BitBuffer;
use crate::storage::objects::ObjectTable;
use crate::storage::Storage;
use crate::types::ObjectRef;

pub const SNAPSHOT_HEADER_SIZE: usize = 40;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SnapshotHeader {
    magic: [u8; 8],
    fingerprint: U64<LittleEndian>,
    capacity: U64<LittleEndian>,
    row_stride_bits: U64<LittleEndian>,
    segments: U32<LittleEndian>,
    lists: U32<LittleEndian>,
}

const _: () = assert!(
    std::mem::size_of::<SnapshotHeader>() == SNAPSHOT_HEADER_SIZE,
    "SnapshotHeader must be exactly SNAPSHOT_HEADER_SIZE bytes"
);

impl SnapshotHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= SNAPSHOT_HEADER_SIZE,
            "buffer too small for SnapshotHeader: {} < {}",
            data.len(),
            SNAPSHOT_HEADER_SIZE
        );
        ensure!(
            &data[..8] == SNAPSHOT_MAGIC,
            "invalid snapshot: magic bytes mismatch"
        );
        Self::ref_from_bytes(&data[..SNAPSHOT_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read SnapshotHeader: {:?}", e))
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= SNAPSHOT_HEADER_SIZE,
            "buffer too small for SnapshotHeader: {} < {}",
            data.len(),
            SNAPSHOT_HEADER_SIZE
        );
        data[..SNAPSHOT_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint.get()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity.get()
    }

    pub fn row_stride_bits(&self) -> u64 {
        self.row_stride_bits.get()
    }

    pub fn segment_count(&self) -> u32 {
        self.segments.get()
    }

    pub fn list_count(&self) -> u32 {
        self.lists.get()
    }
}

#[derive(Clone)]
pub struct StorageSnapshot {
    fingerprint: u64,
    capacity: usize,
    row_stride_bits: u64,
    growable: bool,
    segments: Vec<Vec<u8>>,
    objects: Vec<Option<ObjectRef>>,
    lists: Vec<((StructId, usize), StorageSnapshot)>,
}

impl StorageSnapshot {
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn row_stride_bits(&self) -> u64 {
        self.row_stride_bits
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Little-endian image of segment `i`. Segment 0 is the row buffer.
    pub fn segment_bytes(&self, i: usize) -> Option<&[u8]> {
        self.segments.get(i).map(Vec::as_slice)
    }

    pub fn live_objects(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    /// List child snapshots keyed by (list struct, parent index), sorted.
    pub fn lists(&self) -> impl Iterator<Item = (StructId, usize, &StorageSnapshot)> {
        self.lists.iter().map(|((id, parent), s)| (*id, *parent, s))
    }

    pub fn list(&self, list: StructId, parent: usize) -> Option<&StorageSnapshot> {
        self.lists
            .binary_search_by_key(&(list, parent), |(key, _)| *key)
            .ok()
            .map(|i| &self.lists[i].1)
    }

    pub fn header(&self) -> SnapshotHeader {
        SnapshotHeader {
            magic: *SNAPSHOT_MAGIC,
            fingerprint: U64::new(self.fingerprint),
            capacity: U64::new(self.capacity as u64),
            row_stride_bits: U64::new(self.row_stride_bits),
            segments: U32::new(self.segments.len() as u32),
            lists: U32::new(self.lists.len() as u32),
        }
    }
}

impl std::fmt::Debug for StorageSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSnapshot")
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint))
            .field("capacity", &self.capacity)
            .field("row_stride_bits", &self.row_stride_bits)
            .field("segments", &self.segments.len())
            .field("objects", &self.live_objects())
            .field("lists", &self.lists.len())
            .finish()
    }
}

impl Storage {
    /// Captures committed state. Pending writes are not included.
    pub fn snapshot(&self) -> StorageSnapshot {
        let mut lists: Vec<((StructId, usize), StorageSnapshot)> = self
            .lists
            .iter()
            .map(|(key, child)| (*key, child.snapshot()))
            .collect();
        lists.sort_by_key(|(key, _)| *key);

        StorageSnapshot {
            fingerprint: self.schema.fingerprint(),
            capacity: self.capacity,
            row_stride_bits: self.schema.row_stride_bits(),
            growable: self.growable,
            segments: self.segments.iter().map(BitBuffer::to_le_bytes).collect(),
            objects: self.objects.slots().to_vec(),
            lists,
        }
    }

    /// Rebuilds a storage from `snapshot` against `schema`, which must have
    /// the snapshot's exact layout.
    pub fn restore(schema: Arc<CompiledSchema>, snapshot: &StorageSnapshot) -> Result<Storage> {
        if snapshot.fingerprint != schema.fingerprint()
            || snapshot.row_stride_bits != schema.row_stride_bits()
            || snapshot.segments.len() != schema.segments().len()
        {
            return Err(StructError::compilation(
                schema.root().name(),
                format!(
                    "snapshot layout {:016x} does not match schema {:016x}",
                    snapshot.fingerprint,
                    schema.fingerprint()
                ),
            )
            .into());
        }

        let mut segments = Vec::with_capacity(snapshot.segments.len());
        for (bytes, seg) in snapshot.segments.iter().zip(schema.segments()) {
            let len_bits = (snapshot.capacity as u64)
                .checked_mul(seg.stride_bits)
                .ok_or_else(|| eyre::eyre!("snapshot capacity overflows segment size"))?;
            segments.push(BitBuffer::from_le_bytes(bytes, len_bits)?);
        }

        let mut lists = HashMap::with_capacity(snapshot.lists.len());
        for ((id, parent), child) in &snapshot.lists {
            ensure!(
                *parent < snapshot.capacity,
                "list child at parent index {} outside capacity {}",
                parent,
                snapshot.capacity
            );
            let element = schema
                .struct_at(*id)
                .and_then(|s| s.list_schema())
                .ok_or_else(|| {
                    StructError::compilation(
                        schema.root().name(),
                        format!("snapshot names struct #{} as a list", id),
                    )
                })?;
            lists.insert((*id, *parent), Storage::restore(Arc::clone(element), child)?);
        }

        Ok(Storage::from_parts(
            schema,
            snapshot.capacity,
            snapshot.growable,
            segments,
            ObjectTable::from_slots(snapshot.objects.clone()),
            lists,
        ))
    }
}
