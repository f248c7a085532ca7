//! bitpeg: a memoizing PEG parser-combinator engine that works down to the bit.
//!
//! Grammars are assembled with a [`GrammarBuilder`], one constructor per
//! combinator, then frozen into an immutable [`Grammar`] and matched against byte
//! buffers any number of times. Byte-level primitives (`token`, `ch`,
//! `ch_range`, `charset_in`) sit next to bit-level ones (`bits`, `uint16`, ...),
//! so text formats and packed binary headers are described the same way.
//!
//! ```rust
//! use bitpeg::{GrammarBuilder, Value};
//!
//! let mut g = GrammarBuilder::new();
//! let version = g.bits(4, false).unwrap();
//! let length = g.bits(4, false).unwrap();
//! let header = g.sequence(&[version, length]).unwrap();
//! let grammar = g.finish().unwrap();
//!
//! let result = grammar.parse(header, &[0x45]).unwrap();
//! let fields = result.value().and_then(Value::as_sequence).unwrap();
//! assert_eq!(fields[0].as_u64(), Some(4));
//! assert_eq!(fields[1].as_u64(), Some(5));
//! ```

pub use crate::config::EngineConfig;
pub use crate::engine::{Engine, Failure, FailureKind, MatchStats, ParseResult, Success};
pub use crate::errors::{CallbackError, ConfigError, ErrorCategory, GrammarError, MatchError};
pub use crate::grammar::{Charset, Grammar, GrammarBuilder, Node, ParserId, SlotId};
pub use crate::input::Cursor;
pub use crate::value::{Integer, UserValue, Value};

pub mod actions;
pub mod callbacks;
pub mod cli;
pub mod config;
pub mod dns;
pub mod engine;
pub mod errors;
pub mod grammar;
pub mod input;
pub mod value;
