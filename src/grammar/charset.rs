//! Byte sets for `charset_in` / `not_in`, stored as a 256-bit bitmap.

use std::ops::RangeInclusive;

/// A set of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Charset {
    bitmap: [u64; 4],
}

/// Bytes skipped by `whitespace`: space, `\t`, `\n`, `\v`, `\f`, `\r`.
pub const WHITESPACE: Charset = Charset {
    bitmap: [
        (1 << b' ') | (1 << b'\t') | (1 << b'\n') | (1 << 0x0b) | (1 << 0x0c) | (1 << b'\r'),
        0,
        0,
        0,
    ],
};

impl Charset {
    pub const fn new() -> Self {
        Self { bitmap: [0; 4] }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut set = Self::new();
        for &b in bytes {
            set.insert(b);
        }
        set
    }

    pub fn from_range(range: RangeInclusive<u8>) -> Self {
        let mut set = Self::new();
        for b in range {
            set.insert(b);
        }
        set
    }

    pub fn insert(&mut self, byte: u8) {
        self.bitmap[usize::from(byte / 64)] |= 1u64 << (byte % 64);
    }

    pub fn remove(&mut self, byte: u8) {
        self.bitmap[usize::from(byte / 64)] &= !(1u64 << (byte % 64));
    }

    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        self.bitmap[usize::from(byte / 64)] & (1u64 << (byte % 64)) != 0
    }

    /// Every byte not in this set.
    pub fn complement(&self) -> Self {
        let mut bitmap = self.bitmap;
        for word in &mut bitmap {
            *word = !*word;
        }
        Self { bitmap }
    }

    pub fn len(&self) -> usize {
        self.bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.iter().all(|&w| w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |&b| self.contains(b))
    }
}

impl From<&[u8]> for Charset {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl<const N: usize> From<&[u8; N]> for Charset {
    fn from(bytes: &[u8; N]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<RangeInclusive<u8>> for Charset {
    fn from(range: RangeInclusive<u8>) -> Self {
        Self::from_range(range)
    }
}

impl FromIterator<u8> for Charset {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::new();
        for b in iter {
            set.insert(b);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_and_complement() {
        let set = Charset::from_bytes(b"az\xff");
        assert!(set.contains(b'a') && set.contains(b'z') && set.contains(0xff));
        assert!(!set.contains(b'b'));
        assert_eq!(set.len(), 3);
        let inverse = set.complement();
        assert!(!inverse.contains(b'a'));
        assert!(inverse.contains(b'b'));
        assert_eq!(inverse.len(), 253);
    }

    #[test]
    fn whitespace_set() {
        for b in [b' ', b'\t', b'\n', 0x0b, 0x0c, b'\r'] {
            assert!(WHITESPACE.contains(b));
        }
        assert!(!WHITESPACE.contains(b'x'));
        assert_eq!(WHITESPACE.len(), 6);
    }

    #[test]
    fn ranges() {
        let digits = Charset::from(b'0'..=b'9');
        assert_eq!(digits.iter().collect::<Vec<_>>(), b"0123456789".to_vec());
    }
}
