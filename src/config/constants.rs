//! # structstore Configuration Constants
//!
//! ## Dependency Graph
//!
//! ```text
//! WORD_BITS (64)
//!       │
//!       ├─> MAX_FIELD_BITS (must be <=)
//!       │     A field is read with at most two word loads and one shift.
//!       │
//!       ├─> MAX_UNION_BITS (must be <=)
//!       │     Union reinterpretation extracts the whole region as one u64.
//!       │
//!       └─> DEFAULT_ALIGN_BITS (must divide)
//!             Aligned slots never straddle a word when the field fits.
//!
//! OBJECT_SLOT_BITS (32)
//!       │
//!       └─> bounds the number of live objects per storage (2^32 - 1)
//!
//! MAX_STRIDE_BITS (u32::MAX)
//!       │
//!       └─> default limit for one struct body; offsets fit in u32
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `MAX_FIELD_BITS <= WORD_BITS`
//! 2. `MAX_UNION_BITS <= WORD_BITS`
//! 3. `WORD_BITS % DEFAULT_ALIGN_BITS == 0`
//! 4. `OBJECT_SLOT_BITS <= MAX_FIELD_BITS`

// ============================================================================
// BIT BUFFER CONFIGURATION
// ============================================================================

/// Width of one backing word in bits.
pub const WORD_BITS: u32 = 64;

/// Widest primitive a single field may declare.
pub const MAX_FIELD_BITS: u32 = 64;

/// Widest region a union may reserve.
pub const MAX_UNION_BITS: u32 = 64;

const _: () = assert!(
    MAX_FIELD_BITS <= WORD_BITS,
    "MAX_FIELD_BITS must fit in one backing word"
);

const _: () = assert!(
    MAX_UNION_BITS <= WORD_BITS,
    "MAX_UNION_BITS must fit in one backing word"
);

// ============================================================================
// LAYOUT CONFIGURATION
// ============================================================================

/// Default addressable limit for the stride of a single struct body.
pub const MAX_STRIDE_BITS: u64 = u32::MAX as u64;

/// Default boundary used by the aligned strategy.
pub const DEFAULT_ALIGN_BITS: u32 = 64;

/// Smallest boundary accepted by the aligned strategy.
pub const MIN_ALIGN_BITS: u32 = 8;

const _: () = assert!(
    WORD_BITS % DEFAULT_ALIGN_BITS == 0,
    "DEFAULT_ALIGN_BITS must divide WORD_BITS"
);

const _: () = assert!(
    MIN_ALIGN_BITS <= DEFAULT_ALIGN_BITS,
    "MIN_ALIGN_BITS must not exceed DEFAULT_ALIGN_BITS"
);

// ============================================================================
// OBJECT SLOTS
// ============================================================================

/// Bits stored in the row for an object reference. Zero encodes "no object".
pub const OBJECT_SLOT_BITS: u32 = 32;

const _: () = assert!(
    OBJECT_SLOT_BITS <= MAX_FIELD_BITS,
    "OBJECT_SLOT_BITS must be a valid field width"
);

// ============================================================================
// LIST GROWTH
// ============================================================================

/// Minimum number of elements reserved when a list child grows by push.
pub const LIST_MIN_RESERVE: usize = 4;

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// Leading bytes of an encoded snapshot header.
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"SSTORE01";
