//! Input positions and bit-granular reads.
//!
//! A [`Cursor`] addresses the input at bit granularity: a byte offset plus a bit
//! offset inside that byte. Bits are numbered most significant first, so reading
//! four bits at `bit == 0` yields the high nibble of the byte.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CURSOR
// ============================================================================

/// A position in the input, tracked to the bit.
///
/// Cursors order by `(byte, bit)`, which is also the order of input positions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Cursor {
    /// Offset of the current byte.
    pub byte: usize,
    /// Offset inside the current byte, always in `0..8`.
    pub bit: u8,
}

impl Cursor {
    /// The start of the input.
    pub const fn start() -> Self {
        Self { byte: 0, bit: 0 }
    }

    /// A byte-aligned cursor at `byte`.
    pub const fn at_byte(byte: usize) -> Self {
        Self { byte, bit: 0 }
    }

    /// Creates a cursor, carrying any excess bits into the byte offset.
    pub fn new(byte: usize, bit: u8) -> Self {
        Self {
            byte: byte + usize::from(bit / 8),
            bit: bit % 8,
        }
    }

    /// True when the cursor sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit == 0
    }

    /// Absolute position in bits from the start of the input.
    pub fn bit_position(&self) -> u64 {
        self.byte as u64 * 8 + u64::from(self.bit)
    }

    /// Inverse of [`Cursor::bit_position`].
    pub fn from_bit_position(bits: u64) -> Self {
        Self {
            byte: (bits / 8) as usize,
            bit: (bits % 8) as u8,
        }
    }

    /// The cursor `bits` further on, or `None` on arithmetic overflow.
    pub fn advance_bits(&self, bits: u64) -> Option<Self> {
        self.bit_position()
            .checked_add(bits)
            .map(Self::from_bit_position)
    }

    /// The cursor `bytes` further on, keeping the bit offset.
    pub fn advance_bytes(&self, bytes: usize) -> Option<Self> {
        self.byte.checked_add(bytes).map(|byte| Self { byte, bit: self.bit })
    }

    /// Number of bytes touched up to this cursor (a partial byte counts).
    pub fn bytes_spanned(&self) -> usize {
        self.byte + usize::from(self.bit > 0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bit == 0 {
            write!(f, "byte {}", self.byte)
        } else {
            write!(f, "byte {}, bit {}", self.byte, self.bit)
        }
    }
}

// ============================================================================
// INPUT VIEW
// ============================================================================

/// Read-only view of the input buffer used by the engine.
///
/// Every read is bounded by a `limit` cursor so that length-prefixed windows can
/// present a shortened input to the parsers running inside them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Input<'i> {
    data: &'i [u8],
}

impl<'i> Input<'i> {
    pub(crate) fn new(data: &'i [u8]) -> Self {
        Self { data }
    }

    /// The cursor just past the last byte.
    pub(crate) fn end(&self) -> Cursor {
        Cursor::at_byte(self.data.len())
    }

    /// The byte at an aligned cursor, if it lies before `limit`.
    pub(crate) fn byte_at(&self, at: Cursor, limit: Cursor) -> Option<u8> {
        if !at.is_aligned() || at.advance_bytes(1)? > limit {
            return None;
        }
        self.data.get(at.byte).copied()
    }

    /// `len` bytes starting at an aligned cursor, if they end at or before `limit`.
    pub(crate) fn bytes_at(&self, at: Cursor, len: usize, limit: Cursor) -> Option<&'i [u8]> {
        if !at.is_aligned() || at.advance_bytes(len)? > limit {
            return None;
        }
        self.data.get(at.byte..at.byte + len)
    }

    /// Reads `width` bits (at most 64) big-endian starting at any bit offset.
    ///
    /// Returns the raw bits right-aligned in a `u64` and the cursor after them.
    pub(crate) fn read_bits(&self, at: Cursor, width: u32, limit: Cursor) -> Option<(u64, Cursor)> {
        debug_assert!(width <= 64);
        let end = at.advance_bits(u64::from(width))?;
        if end > limit || end > self.end() {
            return None;
        }

        let mut value: u64 = 0;
        let mut pos = at.bit_position();
        let mut remaining = width;
        while remaining > 0 {
            let byte = self.data[(pos / 8) as usize];
            let offset = (pos % 8) as u32;
            let available = 8 - offset;
            let take = available.min(remaining);
            let chunk = (u64::from(byte) >> (available - take)) & ((1u64 << take) - 1);
            value = (value << take) | chunk;
            pos += u64::from(take);
            remaining -= take;
        }
        Some((value, end))
    }
}

/// Interprets the low `width` bits of `raw` as a two's-complement number.
pub(crate) fn sign_extend(raw: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return raw as i64;
    }
    let shift = 64 - width;
    ((raw << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_carries_into_bytes() {
        let c = Cursor::new(1, 6).advance_bits(5).unwrap();
        assert_eq!(c, Cursor { byte: 2, bit: 3 });
        assert_eq!(Cursor::new(0, 9), Cursor { byte: 1, bit: 1 });
    }

    #[test]
    fn cursors_order_by_bit_position() {
        assert!(Cursor::new(1, 0) > Cursor::new(0, 7));
        assert!(Cursor::new(2, 3) < Cursor::new(2, 4));
    }

    #[test]
    fn read_bits_crosses_byte_boundaries() {
        let data = [0xAB, 0xCD, 0xEF];
        let input = Input::new(&data);
        let (first, after) = input.read_bits(Cursor::start(), 12, input.end()).unwrap();
        assert_eq!(first, 0xABC);
        assert_eq!(after, Cursor::new(1, 4));
        let (second, end) = input.read_bits(after, 12, input.end()).unwrap();
        assert_eq!(second, 0xDEF);
        assert_eq!(end, input.end());
    }

    #[test]
    fn read_bits_respects_limit() {
        let data = [0xFF, 0xFF];
        let input = Input::new(&data);
        assert!(input.read_bits(Cursor::start(), 9, Cursor::at_byte(1)).is_none());
        assert!(input.read_bits(Cursor::new(1, 1), 8, input.end()).is_none());
    }

    #[test]
    fn read_full_width() {
        let data = [0x80, 0, 0, 0, 0, 0, 0, 0x01];
        let input = Input::new(&data);
        let (raw, _) = input.read_bits(Cursor::start(), 64, input.end()).unwrap();
        assert_eq!(raw, 0x8000_0000_0000_0001);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0b1111, 4), -1);
        assert_eq!(sign_extend(0b0111, 4), 7);
        assert_eq!(sign_extend(0x80, 8), -128);
    }

    #[test]
    fn byte_reads_require_alignment() {
        let data = [1, 2, 3];
        let input = Input::new(&data);
        assert_eq!(input.byte_at(Cursor::at_byte(1), input.end()), Some(2));
        assert_eq!(input.byte_at(Cursor::new(1, 2), input.end()), None);
        assert_eq!(input.bytes_at(Cursor::start(), 2, Cursor::at_byte(1)), None);
    }
}
