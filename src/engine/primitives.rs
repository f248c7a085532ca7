//! Leaf parsers: bytes, bits, integers and end of input.

use crate::engine::{Fail, Match, Run, Step};
use crate::grammar::{ParserId, WHITESPACE};
use crate::input::{sign_extend, Cursor};
use crate::value::{Integer, Value};

impl<'g, 'i> Run<'g, 'i> {
    pub(super) fn token(&mut self, bytes: &[u8], at: Cursor) -> Step {
        match self.input.bytes_at(at, bytes.len(), self.limit) {
            Some(found) if found == bytes => {
                let end = Cursor::at_byte(at.byte + bytes.len());
                Ok(Match::new(end, Value::Bytes(found.to_vec())))
            }
            _ => Err(Fail::no_match(at)),
        }
    }

    /// One aligned byte accepted by `accept`, yielded as an 8-bit unsigned integer.
    pub(super) fn byte_if(&mut self, at: Cursor, accept: impl Fn(u8) -> bool) -> Step {
        match self.input.byte_at(at, self.limit) {
            Some(b) if accept(b) => Ok(Match::new(Cursor::at_byte(at.byte + 1), Value::uint(u64::from(b), 8))),
            _ => Err(Fail::no_match(at)),
        }
    }

    pub(super) fn bits(&mut self, width: u8, signed: bool, at: Cursor) -> Step {
        let (raw, end) = self
            .input
            .read_bits(at, u32::from(width), self.limit)
            .ok_or_else(|| Fail::no_match(at))?;
        let value = if signed {
            Integer::Signed {
                value: sign_extend(raw, u32::from(width)),
                width,
            }
        } else {
            Integer::Unsigned { value: raw, width }
        };
        Ok(Match::new(end, Value::Integer(value)))
    }

    pub(super) fn int_range(&mut self, base: ParserId, low: i64, high: i64, at: Cursor) -> Step {
        let m = self.apply(base, at).map_err(|f| f.at(at))?;
        let in_range = m
            .value
            .as_ref()
            .and_then(Value::as_integer)
            .is_some_and(|n| (i128::from(low)..=i128::from(high)).contains(&n.as_i128()));
        if in_range {
            Ok(m)
        } else {
            Err(Fail::no_match(at).reached(m.end))
        }
    }

    /// Skips whitespace bytes while aligned, then runs `inner`.
    pub(super) fn whitespace(&mut self, inner: ParserId, at: Cursor) -> Step {
        let mut cursor = at;
        while let Some(b) = self.input.byte_at(cursor, self.limit) {
            if !WHITESPACE.contains(b) {
                break;
            }
            cursor = Cursor::at_byte(cursor.byte + 1);
        }
        self.apply(inner, cursor).map_err(|f| f.at(at))
    }

    pub(super) fn end(&mut self, at: Cursor) -> Step {
        if at >= self.limit {
            Ok(Match::absent(at))
        } else {
            Err(Fail::no_match(at))
        }
    }
}
