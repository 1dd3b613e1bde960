//! # Bit Buffer
//!
//! A growable run of bits backed by `u64` words. Offsets are absolute bit
//! positions; a value of up to 64 bits may straddle two words:
//!
//! ```text
//! word 0                                word 1
//! [ .......................... vvvvvv ] [ vvvv ........................ ]
//!                              ^ offset % 64            ^ spill = width - (64 - shift)
//! ```
//!
//! Bits past `len_bits` are always zero, so shrinking then growing never
//! resurrects stale data.

use eyre::{ensure, Result};
use zerocopy::byteorder::{LittleEndian, U64};
use zerocopy::{FromBytes, IntoBytes};

use crate::config::WORD_BITS;
use crate::types::low_mask;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BitBuffer {
    words: Vec<u64>,
    len_bits: u64,
}

impl BitBuffer {
    pub(crate) fn zeroed(len_bits: u64) -> Self {
        Self {
            words: vec![0; words_for(len_bits)],
            len_bits,
        }
    }

    pub(crate) fn len_bits(&self) -> u64 {
        self.len_bits
    }

    /// Reads `width` bits at `offset`. Caller guarantees the range is in bounds.
    #[inline]
    pub(crate) fn get(&self, offset: u64, width: u32) -> u64 {
        debug_assert!(width <= WORD_BITS);
        debug_assert!(offset + width as u64 <= self.len_bits);
        if width == 0 {
            return 0;
        }
        let word = (offset / WORD_BITS as u64) as usize;
        let shift = (offset % WORD_BITS as u64) as u32;
        let mut value = self.words[word] >> shift;
        let taken = WORD_BITS - shift;
        if taken < width {
            value |= self.words[word + 1] << taken;
        }
        value & low_mask(width)
    }

    /// Writes the low `width` bits of `value` at `offset`.
    #[inline]
    pub(crate) fn set(&mut self, offset: u64, width: u32, value: u64) {
        debug_assert!(width <= WORD_BITS);
        debug_assert!(offset + width as u64 <= self.len_bits);
        if width == 0 {
            return;
        }
        let value = value & low_mask(width);
        let word = (offset / WORD_BITS as u64) as usize;
        let shift = (offset % WORD_BITS as u64) as u32;
        let taken = WORD_BITS - shift;

        let low_width = width.min(taken);
        let mask = low_mask(low_width) << shift;
        self.words[word] = (self.words[word] & !mask) | ((value << shift) & mask);

        if taken < width {
            let spill = width - taken;
            let mask = low_mask(spill);
            self.words[word + 1] = (self.words[word + 1] & !mask) | ((value >> taken) & mask);
        }
    }

    /// Zeroes `[offset, offset + len)`.
    pub(crate) fn clear_range(&mut self, offset: u64, len: u64) {
        let mut at = offset;
        let end = offset + len;
        while at < end {
            let width = (end - at).min(WORD_BITS as u64) as u32;
            self.set(at, width, 0);
            at += width as u64;
        }
    }

    /// Grows with zero bits or truncates, keeping the tail invariant.
    pub(crate) fn resize(&mut self, len_bits: u64) {
        if len_bits < self.len_bits {
            self.clear_range(len_bits, self.len_bits - len_bits);
        }
        self.words.resize(words_for(len_bits), 0);
        self.len_bits = len_bits;
    }

    pub(crate) fn reserve_bits(&mut self, additional: u64) {
        let needed = words_for(self.len_bits + additional);
        self.words.reserve(needed.saturating_sub(self.words.len()));
    }

    /// Little-endian byte image of the backing words.
    pub(crate) fn to_le_bytes(&self) -> Vec<u8> {
        let words: Vec<U64<LittleEndian>> = self.words.iter().map(|w| U64::new(*w)).collect();
        words.as_bytes().to_vec()
    }

    pub(crate) fn from_le_bytes(bytes: &[u8], len_bits: u64) -> Result<Self> {
        let words = <[U64<LittleEndian>]>::ref_from_bytes(bytes)
            .map_err(|e| eyre::eyre!("failed to read bit buffer: {:?}", e))?;
        ensure!(
            words.len() == words_for(len_bits),
            "bit buffer of {} bits needs {} words, got {}",
            len_bits,
            words_for(len_bits),
            words.len()
        );
        let buffer = Self {
            words: words.iter().map(|w| w.get()).collect(),
            len_bits,
        };
        let tail = len_bits % WORD_BITS as u64;
        if tail != 0 {
            if let Some(last) = buffer.words.last() {
                ensure!(
                    last & !low_mask(tail as u32) == 0,
                    "bit buffer has data past its length"
                );
            }
        }
        Ok(buffer)
    }
}

fn words_for(len_bits: u64) -> usize {
    len_bits.div_ceil(WORD_BITS as u64) as usize
}
