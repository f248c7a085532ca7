use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::MatchError;
use crate::grammar::SlotId;
use crate::input::Cursor;
use crate::value::Value;

// ============================================================================
// FAILURE CLASSIFICATION
// ============================================================================

/// Why a match failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Ordinary negative outcome of a parser.
    NoMatch,
    /// An action or predicate returned an error.
    Callback { message: String },
    /// An indirect target was re-entered at the same position within one call
    /// chain, which would recurse forever.
    LeftRecursion { slot: SlotId },
    /// Nested indirect calls exceeded the configured bound.
    RecursionLimit { limit: usize },
}

impl FailureKind {
    /// Fatal failures end the run: no combinator may absorb them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FailureKind::LeftRecursion { .. } | FailureKind::RecursionLimit { .. }
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NoMatch => f.write_str("no match"),
            FailureKind::Callback { message } => write!(f, "callback rejected: {}", message),
            FailureKind::LeftRecursion { slot } => write!(f, "left recursion through {}", slot),
            FailureKind::RecursionLimit { limit } => {
                write!(f, "recursion depth limit of {} exceeded", limit)
            }
        }
    }
}

// ============================================================================
// PARSE RESULT
// ============================================================================

/// A successful top-level match.
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    /// Position just after the matched input.
    pub cursor: Cursor,
    pub value: Value,
}

impl Success {
    /// Bytes consumed, counting a partially read final byte.
    pub fn bytes_consumed(&self) -> usize {
        self.cursor.bytes_spanned()
    }

    pub fn bits_consumed(&self) -> u64 {
        self.cursor.bit_position()
    }
}

/// A failed top-level match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Where the failing parser was attempted; the cursor is restored here.
    pub position: Cursor,
    /// The deepest position at which any attempted alternative failed.
    pub deepest: Cursor,
    pub kind: FailureKind,
}

/// Outcome of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Success(Success),
    Failure(Failure),
}

impl ParseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseResult::Success(_))
    }

    pub fn success(&self) -> Option<&Success> {
        match self {
            ParseResult::Success(s) => Some(s),
            ParseResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ParseResult::Failure(f) => Some(f),
            ParseResult::Success(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        self.success().map(|s| &s.value)
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            ParseResult::Success(s) => Some(s.value),
            ParseResult::Failure(_) => None,
        }
    }

    /// Cursor after a success, or the failure position.
    pub fn cursor(&self) -> Cursor {
        match self {
            ParseResult::Success(s) => s.cursor,
            ParseResult::Failure(f) => f.position,
        }
    }

    pub fn bytes_consumed(&self) -> Option<usize> {
        self.success().map(Success::bytes_consumed)
    }

    /// Converts a failure into a [`MatchError`].
    pub fn into_result(self) -> Result<Success, MatchError> {
        match self {
            ParseResult::Success(s) => Ok(s),
            ParseResult::Failure(f) => Err(MatchError {
                kind: f.kind,
                position: f.position,
                deepest: f.deepest,
            }),
        }
    }
}

// ============================================================================
// RUN STATISTICS
// ============================================================================

/// Counters collected during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    /// Node evaluations that were not served from the cache.
    pub evaluations: usize,
    pub cache_hits: usize,
    /// Distinct `(node, position)` results held by the cache at the end.
    pub cache_entries: usize,
    /// Deepest nesting of indirect calls reached.
    pub max_depth: usize,
}
