//! bitpeg error types.
//!
//! Two classes are kept strictly apart:
//!
//! - [`GrammarError`]: construction and configuration errors, reported by the
//!   grammar builders and by [`GrammarBuilder::finish`](crate::grammar::GrammarBuilder::finish)
//!   before any input is read.
//! - [`MatchError`]: a failed match, i.e. an ordinary negative outcome of a run,
//!   available as a `std::error::Error` for callers that prefer `?`.
//!
//! [`ConfigError`] covers engine configuration loading, and [`CallbackError`] is
//! what user actions and predicates return to reject a match.

use miette::Diagnostic;
use thiserror::Error;

use crate::engine::FailureKind;
use crate::grammar::{ParserId, SlotId};
use crate::input::Cursor;

// ============================================================================
// GRAMMAR ERRORS
// ============================================================================

/// Broad classification of a [`GrammarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// An argument violated a node invariant at builder call time.
    Construction,
    /// The grammar as a whole is not usable (binding and freezing problems).
    Configuration,
}

/// Errors raised while assembling or freezing a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GrammarError {
    #[error("{combinator} requires at least one child parser")]
    #[diagnostic(
        code(bitpeg::grammar::empty_children),
        help("use `epsilon_p()` for a parser that always succeeds, or `nothing_p()` for one that always fails")
    )]
    EmptyChildren { combinator: &'static str },

    #[error("ChRange low {low:#04x} > high {high:#04x}")]
    #[diagnostic(code(bitpeg::grammar::char_range))]
    InvalidCharRange { low: u8, high: u8 },

    #[error("IntRange low {low} > high {high}")]
    #[diagnostic(code(bitpeg::grammar::int_range))]
    InvalidIntRange { low: i64, high: i64 },

    #[error("Bits width is zero")]
    #[diagnostic(code(bitpeg::grammar::bit_width))]
    ZeroBitWidth,

    #[error("Bits width {width} exceeds 64")]
    #[diagnostic(code(bitpeg::grammar::bit_width))]
    BitWidthTooLarge { width: usize },

    #[error("{combinator} base parser {parser} does not produce an integer")]
    #[diagnostic(
        code(bitpeg::grammar::not_integer),
        help("integer-producing parsers are bits, the fixed-width integers, ch, ch_range, charset_in and int_range, possibly wrapped in whitespace/left/right/middle/choice/attr_bool")
    )]
    NotIntegerProducing {
        combinator: &'static str,
        parser: ParserId,
    },

    #[error("parser {parser} does not belong to this grammar")]
    #[diagnostic(code(bitpeg::grammar::foreign_parser))]
    ForeignParser { parser: ParserId },

    #[error("parser {parser} is not an indirect placeholder")]
    #[diagnostic(code(bitpeg::grammar::not_indirect))]
    NotIndirect { parser: ParserId },

    #[error("indirect {slot} is already bound")]
    #[diagnostic(
        code(bitpeg::grammar::rebind),
        help("each indirect slot is bound exactly once")
    )]
    AlreadyBound { slot: SlotId },

    #[error("indirect {slot} was never bound")]
    #[diagnostic(
        code(bitpeg::grammar::unbound),
        help("call `bind_indirect` for every `indirect()` before finishing the grammar")
    )]
    UnboundSlot { slot: SlotId },
}

impl GrammarError {
    /// Get the error category for assertions and reporting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyChildren { .. }
            | Self::InvalidCharRange { .. }
            | Self::InvalidIntRange { .. }
            | Self::ZeroBitWidth
            | Self::BitWidthTooLarge { .. }
            | Self::NotIntegerProducing { .. }
            | Self::ForeignParser { .. }
            | Self::NotIndirect { .. } => ErrorCategory::Construction,

            Self::AlreadyBound { .. } | Self::UnboundSlot { .. } => ErrorCategory::Configuration,
        }
    }
}

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    #[diagnostic(code(bitpeg::config::json))]
    Json(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    #[diagnostic(code(bitpeg::config::value))]
    InvalidValue { field: &'static str, reason: String },
}

// ============================================================================
// CALLBACK AND MATCH ERRORS
// ============================================================================

/// Returned by an action or predicate to reject the current match.
///
/// The engine turns it into a match failure at the callback's position; it never
/// aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CallbackError {
    pub message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A failed top-level match, in error form.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("no match at {position} ({kind}); deepest failure at {deepest}")]
#[diagnostic(code(bitpeg::parse::failed))]
pub struct MatchError {
    pub kind: FailureKind,
    pub position: Cursor,
    pub deepest: Cursor,
}
