//! One constructor per grammar node.
//!
//! Builders validate their arguments immediately and never read input. Leaf
//! constructors that cannot fail return a [`ParserId`] directly; everything that
//! takes child parsers returns `Result` because a child may come from a different
//! grammar.

use crate::callbacks::{Action, Predicate};
use crate::errors::{CallbackError, GrammarError};
use crate::grammar::{Charset, GrammarBuilder, Node, ParserId};
use crate::value::Value;

impl GrammarBuilder {
    // ========================================================================
    // BYTE PRIMITIVES
    // ========================================================================

    /// Matches the exact byte string `bytes`; yields `Bytes`.
    pub fn token(&mut self, bytes: impl AsRef<[u8]>) -> ParserId {
        self.push_leaf(Node::Token(bytes.as_ref().to_vec()))
    }

    /// Matches the single byte `byte`; yields an 8-bit unsigned integer.
    pub fn ch(&mut self, byte: u8) -> ParserId {
        self.push_leaf(Node::Ch(byte))
    }

    /// Matches one byte in `low..=high`.
    pub fn ch_range(&mut self, low: u8, high: u8) -> Result<ParserId, GrammarError> {
        if low > high {
            return Err(GrammarError::InvalidCharRange { low, high });
        }
        Ok(self.push_leaf(Node::ChRange { low, high }))
    }

    /// Matches one byte contained in `set`.
    pub fn charset_in(&mut self, set: impl Into<Charset>) -> ParserId {
        self.push_leaf(Node::CharsetIn(set.into()))
    }

    /// Matches one byte not contained in `set`.
    pub fn not_in(&mut self, set: impl Into<Charset>) -> ParserId {
        let set = set.into();
        self.push_leaf(Node::CharsetIn(set.complement()))
    }

    // ========================================================================
    // BIT AND INTEGER PRIMITIVES
    // ========================================================================

    /// Reads `width` bits big-endian, as a signed or unsigned integer.
    pub fn bits(&mut self, width: usize, signed: bool) -> Result<ParserId, GrammarError> {
        match width {
            0 => Err(GrammarError::ZeroBitWidth),
            1..=64 => Ok(self.push_leaf(Node::Bits {
                width: width as u8,
                signed,
            })),
            _ => Err(GrammarError::BitWidthTooLarge { width }),
        }
    }

    fn fixed_width(&mut self, width: u8, signed: bool) -> ParserId {
        self.push_leaf(Node::Bits { width, signed })
    }

    pub fn int8(&mut self) -> ParserId {
        self.fixed_width(8, true)
    }

    pub fn int16(&mut self) -> ParserId {
        self.fixed_width(16, true)
    }

    pub fn int32(&mut self) -> ParserId {
        self.fixed_width(32, true)
    }

    pub fn int64(&mut self) -> ParserId {
        self.fixed_width(64, true)
    }

    pub fn uint8(&mut self) -> ParserId {
        self.fixed_width(8, false)
    }

    pub fn uint16(&mut self) -> ParserId {
        self.fixed_width(16, false)
    }

    pub fn uint32(&mut self) -> ParserId {
        self.fixed_width(32, false)
    }

    pub fn uint64(&mut self) -> ParserId {
        self.fixed_width(64, false)
    }

    /// Runs `base` and accepts its integer only if it lies in `low..=high`.
    ///
    /// `base` must be statically known to produce an integer.
    pub fn int_range(&mut self, base: ParserId, low: i64, high: i64) -> Result<ParserId, GrammarError> {
        self.check(base)?;
        if low > high {
            return Err(GrammarError::InvalidIntRange { low, high });
        }
        self.require_integer("int_range", base)?;
        self.push(Node::IntRange { base, low, high })
    }

    // ========================================================================
    // SPECIAL PARSERS
    // ========================================================================

    /// Succeeds only at the end of the input (or of the enclosing length window).
    pub fn end_p(&mut self) -> ParserId {
        self.push_leaf(Node::EndP)
    }

    /// Always fails.
    pub fn nothing_p(&mut self) -> ParserId {
        self.push_leaf(Node::NothingP)
    }

    /// Always succeeds without consuming input.
    pub fn epsilon_p(&mut self) -> ParserId {
        self.push_leaf(Node::EpsilonP)
    }

    // ========================================================================
    // COMBINATORS
    // ========================================================================

    /// Skips leading whitespace, then runs `inner`.
    pub fn whitespace(&mut self, inner: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Whitespace(inner))
    }

    /// `a b`, keeping `a`'s value.
    pub fn left(&mut self, a: ParserId, b: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Left(a, b))
    }

    /// `a b`, keeping `b`'s value.
    pub fn right(&mut self, a: ParserId, b: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Right(a, b))
    }

    /// `a b c`, keeping `b`'s value.
    pub fn middle(&mut self, a: ParserId, b: ParserId, c: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Middle(a, b, c))
    }

    pub fn sequence(&mut self, children: &[ParserId]) -> Result<ParserId, GrammarError> {
        if children.is_empty() {
            return Err(GrammarError::EmptyChildren {
                combinator: "sequence",
            });
        }
        self.push(Node::Sequence(children.to_vec()))
    }

    /// Ordered choice: the first alternative that matches wins.
    pub fn choice(&mut self, children: &[ParserId]) -> Result<ParserId, GrammarError> {
        if children.is_empty() {
            return Err(GrammarError::EmptyChildren { combinator: "choice" });
        }
        self.push(Node::Choice(children.to_vec()))
    }

    /// `a`, unless `b` matches at least as much input at the same position.
    pub fn butnot(&mut self, a: ParserId, b: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::ButNot(a, b))
    }

    /// `a`, unless `b` matches at all at the same position.
    pub fn difference(&mut self, a: ParserId, b: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Difference(a, b))
    }

    /// Exactly one of `a` and `b`.
    pub fn xor(&mut self, a: ParserId, b: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Xor(a, b))
    }

    pub fn many(&mut self, inner: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Many(inner))
    }

    pub fn many1(&mut self, inner: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Many1(inner))
    }

    /// Exactly `count` repetitions of `inner`.
    pub fn repeat_n(&mut self, inner: ParserId, count: usize) -> Result<ParserId, GrammarError> {
        self.push(Node::RepeatN { inner, count })
    }

    pub fn optional(&mut self, inner: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Optional(inner))
    }

    /// Runs `inner` and drops its value from the result tree.
    pub fn ignore(&mut self, inner: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Ignore(inner))
    }

    /// `item (sep item)*`, possibly empty.
    pub fn sep_by(&mut self, item: ParserId, sep: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::SepBy { item, sep })
    }

    /// `item (sep item)*`, at least one item.
    pub fn sep_by1(&mut self, item: ParserId, sep: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::SepBy1 { item, sep })
    }

    /// Reads a length `n` with `length`, then runs `value` over exactly `n` bytes.
    pub fn length_value(&mut self, length: ParserId, value: ParserId) -> Result<ParserId, GrammarError> {
        self.check(length)?;
        self.require_integer("length_value", length)?;
        self.push(Node::LengthValue { length, value })
    }

    /// Zero-width positive lookahead.
    pub fn and(&mut self, inner: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::And(inner))
    }

    /// Zero-width negative lookahead.
    pub fn not(&mut self, inner: ParserId) -> Result<ParserId, GrammarError> {
        self.push(Node::Not(inner))
    }

    // ========================================================================
    // CALLBACKS
    // ========================================================================

    /// Runs `inner`, then replaces its value with the action's result.
    pub fn action<F>(&mut self, inner: ParserId, action: F) -> Result<ParserId, GrammarError>
    where
        F: Fn(&Value) -> Result<Value, CallbackError> + Send + Sync + 'static,
    {
        self.push(Node::Action {
            inner,
            action: Action::new(action),
        })
    }

    /// Runs `inner`, then fails unless `predicate` accepts its value.
    pub fn attr_bool<F>(&mut self, inner: ParserId, predicate: F) -> Result<ParserId, GrammarError>
    where
        F: Fn(&Value) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        self.push(Node::AttrBool {
            inner,
            predicate: Predicate::new(predicate),
        })
    }

    // ========================================================================
    // STATIC CHECKS
    // ========================================================================

    fn require_integer(&self, combinator: &'static str, parser: ParserId) -> Result<(), GrammarError> {
        let mut visiting = Vec::new();
        if self.produces_integer(parser, &mut visiting) {
            Ok(())
        } else {
            Err(GrammarError::NotIntegerProducing { combinator, parser })
        }
    }

    /// Whether `id` always yields an integer on success.
    ///
    /// A node reached again while still being examined is assumed to produce an
    /// integer; the other paths through it decide.
    pub(crate) fn produces_integer(&self, id: ParserId, visiting: &mut Vec<ParserId>) -> bool {
        if visiting.contains(&id) {
            return true;
        }
        visiting.push(id);
        let result = match &self.nodes[id.index()] {
            Node::Bits { .. }
            | Node::Ch(_)
            | Node::ChRange { .. }
            | Node::CharsetIn(_)
            | Node::IntRange { .. } => true,
            Node::Whitespace(inner) | Node::AttrBool { inner, .. } => {
                self.produces_integer(*inner, visiting)
            }
            Node::Left(kept, _) | Node::Right(_, kept) | Node::Middle(_, kept, _) => {
                self.produces_integer(*kept, visiting)
            }
            Node::ButNot(a, _) | Node::Difference(a, _) => self.produces_integer(*a, visiting),
            Node::Xor(a, b) => self.produces_integer(*a, visiting) && self.produces_integer(*b, visiting),
            Node::Choice(children) => children
                .iter()
                .all(|child| self.produces_integer(*child, visiting)),
            Node::LengthValue { value, .. } => self.produces_integer(*value, visiting),
            Node::Indirect(slot) => self
                .slot_target(*slot)
                .is_some_and(|target| self.produces_integer(target, visiting)),
            _ => false,
        };
        visiting.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;

    #[test]
    fn integer_analysis_sees_through_wrappers() {
        let mut g = GrammarBuilder::new();
        let byte = g.uint8();
        let ws = g.whitespace(byte).unwrap();
        let semi = g.ch(b';');
        let kept = g.left(ws, semi).unwrap();
        assert!(g.int_range(kept, 0, 10).is_ok());

        let tok = g.token("ab");
        let mixed = g.choice(&[byte, tok]).unwrap();
        let err = g.int_range(mixed, 0, 10).unwrap_err();
        assert!(matches!(err, GrammarError::NotIntegerProducing { .. }));
        assert_eq!(err.category(), ErrorCategory::Construction);
    }

    #[test]
    fn bound_indirect_is_followed() {
        let mut g = GrammarBuilder::new();
        let slot = g.indirect();
        assert!(g.int_range(slot, 0, 1).is_err());
        let byte = g.uint8();
        g.bind_indirect(slot, byte).unwrap();
        assert!(g.int_range(slot, 0, 1).is_ok());
    }
}
