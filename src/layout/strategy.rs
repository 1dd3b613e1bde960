//! # Layout Strategies
//!
//! A strategy decides how many bits a slot of a given payload width consumes
//! and how a struct body's extent is rounded. Strategies are stateless; the
//! compiler asks them and does all offset bookkeeping itself.
//!
//! | Strategy | Slot for a 5-bit field | Slot for a 33-bit field | Stride rounding |
//! |----------|------------------------|-------------------------|-----------------|
//! | `PackedLayout` | 5 | 33 | none |
//! | `AlignedLayout::bytes()` | 8 | 40 | to 8 bits |
//! | `AlignedLayout::words()` | 64 | 64 | to 64 bits |
//!
//! Packed layouts are densest; a field may straddle two backing words.
//! Word-aligned layouts spend space so that every field up to 64 bits sits
//! in exactly one word.

use eyre::Result;

use crate::config::{DEFAULT_ALIGN_BITS, MIN_ALIGN_BITS, WORD_BITS};
use crate::error::StructError;

pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bits consumed by a slot holding `width_bits` of payload. Must be at
    /// least `width_bits`; the compiler rejects strategies that answer less.
    fn slot_bits(&self, width_bits: u32) -> u64;

    /// Final extent of a struct body whose members end at `stride_bits`.
    fn round_stride(&self, stride_bits: u64) -> u64;
}

/// Minimal bit-aligned offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedLayout;

impl LayoutStrategy for PackedLayout {
    fn name(&self) -> &'static str {
        "packed"
    }

    fn slot_bits(&self, width_bits: u32) -> u64 {
        width_bits as u64
    }

    fn round_stride(&self, stride_bits: u64) -> u64 {
        stride_bits
    }
}

/// Every slot and every struct body is rounded up to a fixed boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedLayout {
    boundary_bits: u32,
}

impl AlignedLayout {
    pub fn new(boundary_bits: u32) -> Result<Self> {
        if !boundary_bits.is_power_of_two()
            || !(MIN_ALIGN_BITS..=WORD_BITS).contains(&boundary_bits)
        {
            return Err(StructError::compilation(
                "",
                format!(
                    "alignment boundary must be a power of two in {}..={}, got {}",
                    MIN_ALIGN_BITS, WORD_BITS, boundary_bits
                ),
            )
            .into());
        }
        Ok(Self { boundary_bits })
    }

    pub fn bytes() -> Self {
        Self { boundary_bits: 8 }
    }

    pub fn words() -> Self {
        Self {
            boundary_bits: WORD_BITS,
        }
    }

    pub fn boundary_bits(&self) -> u32 {
        self.boundary_bits
    }

    #[inline]
    fn round_up(&self, bits: u64) -> u64 {
        let b = self.boundary_bits as u64;
        bits.div_ceil(b) * b
    }
}

impl Default for AlignedLayout {
    fn default() -> Self {
        Self {
            boundary_bits: DEFAULT_ALIGN_BITS,
        }
    }
}

impl LayoutStrategy for AlignedLayout {
    fn name(&self) -> &'static str {
        match self.boundary_bits {
            8 => "aligned8",
            16 => "aligned16",
            32 => "aligned32",
            _ => "aligned64",
        }
    }

    fn slot_bits(&self, width_bits: u32) -> u64 {
        self.round_up(width_bits as u64)
    }

    fn round_stride(&self, stride_bits: u64) -> u64 {
        self.round_up(stride_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_slots_are_exact() {
        assert_eq!(PackedLayout.slot_bits(1), 1);
        assert_eq!(PackedLayout.slot_bits(33), 33);
        assert_eq!(PackedLayout.round_stride(17), 17);
    }

    #[test]
    fn aligned_slots_round_up() {
        let bytes = AlignedLayout::bytes();
        assert_eq!(bytes.slot_bits(1), 8);
        assert_eq!(bytes.slot_bits(33), 40);
        assert_eq!(bytes.round_stride(0), 0);

        let words = AlignedLayout::words();
        assert_eq!(words.slot_bits(5), 64);
        assert_eq!(words.slot_bits(64), 64);
        assert_eq!(words.round_stride(65), 128);
    }

    #[test]
    fn aligned_rejects_bad_boundaries() {
        assert!(AlignedLayout::new(12).is_err());
        assert!(AlignedLayout::new(4).is_err());
        assert!(AlignedLayout::new(128).is_err());
        assert_eq!(AlignedLayout::new(16).unwrap().name(), "aligned16");
    }

    #[test]
    fn default_aligned_is_word_sized() {
        assert_eq!(AlignedLayout::default().boundary_bits(), DEFAULT_ALIGN_BITS);
    }
}
