use crate::callbacks::{Action, Predicate};
use crate::grammar::charset::Charset;
use crate::grammar::{ParserId, SlotId};

/// One grammar node. Children are referenced by [`ParserId`] into the owning
/// grammar's arena; recursion goes through [`Node::Indirect`] only.
///
/// The fixed-width integer builders (`uint8` .. `int64`) produce [`Node::Bits`]
/// nodes of the matching width.
#[derive(Debug, Clone)]
pub enum Node {
    Token(Vec<u8>),
    Ch(u8),
    ChRange { low: u8, high: u8 },
    IntRange { base: ParserId, low: i64, high: i64 },
    Bits { width: u8, signed: bool },
    Whitespace(ParserId),
    Left(ParserId, ParserId),
    Right(ParserId, ParserId),
    Middle(ParserId, ParserId, ParserId),
    Action { inner: ParserId, action: Action },
    CharsetIn(Charset),
    EndP,
    NothingP,
    Sequence(Vec<ParserId>),
    Choice(Vec<ParserId>),
    ButNot(ParserId, ParserId),
    Difference(ParserId, ParserId),
    Xor(ParserId, ParserId),
    Many(ParserId),
    Many1(ParserId),
    RepeatN { inner: ParserId, count: usize },
    Optional(ParserId),
    Ignore(ParserId),
    SepBy { item: ParserId, sep: ParserId },
    SepBy1 { item: ParserId, sep: ParserId },
    EpsilonP,
    LengthValue { length: ParserId, value: ParserId },
    AttrBool { inner: ParserId, predicate: Predicate },
    And(ParserId),
    Not(ParserId),
    Indirect(SlotId),
}

impl Node {
    /// Combinator name, as used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Token(_) => "token",
            Node::Ch(_) => "ch",
            Node::ChRange { .. } => "ch_range",
            Node::IntRange { .. } => "int_range",
            Node::Bits { .. } => "bits",
            Node::Whitespace(_) => "whitespace",
            Node::Left(..) => "left",
            Node::Right(..) => "right",
            Node::Middle(..) => "middle",
            Node::Action { .. } => "action",
            Node::CharsetIn(_) => "charset_in",
            Node::EndP => "end_p",
            Node::NothingP => "nothing_p",
            Node::Sequence(_) => "sequence",
            Node::Choice(_) => "choice",
            Node::ButNot(..) => "butnot",
            Node::Difference(..) => "difference",
            Node::Xor(..) => "xor",
            Node::Many(_) => "many",
            Node::Many1(_) => "many1",
            Node::RepeatN { .. } => "repeat_n",
            Node::Optional(_) => "optional",
            Node::Ignore(_) => "ignore",
            Node::SepBy { .. } => "sep_by",
            Node::SepBy1 { .. } => "sep_by1",
            Node::EpsilonP => "epsilon_p",
            Node::LengthValue { .. } => "length_value",
            Node::AttrBool { .. } => "attr_bool",
            Node::And(_) => "and",
            Node::Not(_) => "not",
            Node::Indirect(_) => "indirect",
        }
    }

    /// Direct children, in evaluation order. Indirect targets are not included.
    pub fn children(&self) -> Vec<ParserId> {
        match self {
            Node::Token(_)
            | Node::Ch(_)
            | Node::ChRange { .. }
            | Node::Bits { .. }
            | Node::CharsetIn(_)
            | Node::EndP
            | Node::NothingP
            | Node::EpsilonP
            | Node::Indirect(_) => Vec::new(),

            Node::IntRange { base: p, .. }
            | Node::Whitespace(p)
            | Node::Action { inner: p, .. }
            | Node::Many(p)
            | Node::Many1(p)
            | Node::RepeatN { inner: p, .. }
            | Node::Optional(p)
            | Node::Ignore(p)
            | Node::AttrBool { inner: p, .. }
            | Node::And(p)
            | Node::Not(p) => vec![*p],

            Node::Left(a, b)
            | Node::Right(a, b)
            | Node::ButNot(a, b)
            | Node::Difference(a, b)
            | Node::Xor(a, b)
            | Node::SepBy { item: a, sep: b }
            | Node::SepBy1 { item: a, sep: b }
            | Node::LengthValue {
                length: a,
                value: b,
            } => vec![*a, *b],

            Node::Middle(a, b, c) => vec![*a, *b, *c],

            Node::Sequence(children) | Node::Choice(children) => children.clone(),
        }
    }
}
