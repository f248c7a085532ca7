//! The matching engine.
//!
//! [`Engine::run`] evaluates a parser of a frozen [`Grammar`] against an input
//! buffer, depth-first, with PEG semantics:
//!
//! - `choice` is ordered and committed: the first matching alternative wins.
//! - Repetition is greedy and never backtracks into a shorter count.
//! - Every `(node, position)` result is memoized for the duration of the run, so
//!   backtracking never re-derives a result (packrat parsing).
//!
//! Each run owns its cursor, cache, recursion bookkeeping and counters; the
//! grammar is only read. Runs over the same grammar may proceed on different
//! threads at once.
//!
//! ## Failures
//!
//! A failed step records where the failing parser started (`position`) and the
//! deepest point any nested attempt reached (`deepest`). Left recursion and
//! recursion-depth exhaustion are fatal: they bypass `choice`, `optional`, the
//! repetitions and the lookaheads, and surface as the run's result.
//!
//! Evaluation grows the native stack on demand, so a run on a small thread
//! stack still ends in a recursion-limit failure rather than an overflow.

use std::collections::HashSet;

use log::{debug, trace};

use crate::config::EngineConfig;
use crate::errors::GrammarError;
use crate::grammar::{Grammar, Node, ParserId, SlotId};
use crate::input::{Cursor, Input};
use crate::value::Value;

mod combinators;
mod memo;
mod primitives;
mod result;

pub use result::{Failure, FailureKind, MatchStats, ParseResult, Success};

use memo::{MemoCache, MemoKey};

/// Remaining native stack below which an evaluation moves to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

// ============================================================================
// STEP RESULTS
// ============================================================================

/// A successful intermediate match. `value` is `None` when the parser produces
/// nothing to keep (`ignore`, lookaheads, `epsilon_p`, `end_p`); collection
/// combinators skip such values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Match {
    pub(crate) end: Cursor,
    pub(crate) value: Option<Value>,
}

impl Match {
    pub(crate) fn new(end: Cursor, value: Value) -> Self {
        Self {
            end,
            value: Some(value),
        }
    }

    pub(crate) fn absent(end: Cursor) -> Self {
        Self { end, value: None }
    }
}

/// A failed intermediate match.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fail {
    pub(crate) position: Cursor,
    pub(crate) deepest: Cursor,
    pub(crate) kind: FailureKind,
}

impl Fail {
    pub(crate) fn no_match(at: Cursor) -> Self {
        Self::new(at, FailureKind::NoMatch)
    }

    pub(crate) fn new(at: Cursor, kind: FailureKind) -> Self {
        Self {
            position: at,
            deepest: at,
            kind,
        }
    }

    pub(crate) fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Reports the failure at `position`, keeping the deepest point seen.
    pub(crate) fn at(mut self, position: Cursor) -> Self {
        self.deepest = self.deepest.max(position);
        self.position = position;
        self
    }

    /// Records that some attempt got as far as `cursor` before failing.
    pub(crate) fn reached(mut self, cursor: Cursor) -> Self {
        self.deepest = self.deepest.max(cursor);
        self
    }

    /// Of two failures, the one that got further; ties keep `self`.
    pub(crate) fn deeper(self, other: Fail) -> Fail {
        if other.deepest > self.deepest {
            other
        } else {
            self
        }
    }
}

pub(crate) type Step = Result<Match, Fail>;

// ============================================================================
// ENGINE
// ============================================================================

/// Runs parsers of one grammar with one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'g> {
    grammar: &'g Grammar,
    config: EngineConfig,
}

impl<'g> Engine<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_config(grammar, EngineConfig::default())
    }

    pub fn with_config(grammar: &'g Grammar, config: EngineConfig) -> Self {
        Self { grammar, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Matches `root` against `input` from the start.
    ///
    /// Only a `root` from another grammar is an error; every data-dependent
    /// outcome is reported in the [`ParseResult`].
    pub fn run(&self, root: ParserId, input: &[u8]) -> Result<ParseResult, GrammarError> {
        self.run_with_stats(root, input).map(|(result, _)| result)
    }

    /// Like [`run`](Self::run), also returning the run's counters.
    pub fn run_with_stats(
        &self,
        root: ParserId,
        input: &[u8],
    ) -> Result<(ParseResult, MatchStats), GrammarError> {
        self.grammar.check(root)?;
        debug!(
            "run start: root {} ({}), {} input bytes",
            root,
            self.grammar.node_unchecked(root).kind(),
            input.len()
        );

        let mut run = Run::new(self.grammar, self.config, input);
        let step = run.apply(root, Cursor::start());
        run.stats.cache_entries = run.memo.len();

        let result = match step {
            Ok(m) => ParseResult::Success(Success {
                cursor: m.end,
                value: m.value.unwrap_or_default(),
            }),
            Err(f) => ParseResult::Failure(Failure {
                position: f.position,
                deepest: f.deepest,
                kind: f.kind,
            }),
        };
        debug!(
            "run end: {} after {} evaluations ({} cache hits)",
            if result.is_success() { "success" } else { "failure" },
            run.stats.evaluations,
            run.stats.cache_hits
        );
        Ok((result, run.stats))
    }
}

// ============================================================================
// RUN STATE
// ============================================================================

/// Mutable state of a single run.
pub(crate) struct Run<'g, 'i> {
    grammar: &'g Grammar,
    config: EngineConfig,
    input: Input<'i>,
    /// End of the visible input; narrowed inside `length_value` windows.
    limit: Cursor,
    memo: MemoCache,
    /// Indirect targets currently being evaluated, for left-recursion detection.
    active: HashSet<MemoKey>,
    depth: usize,
    stats: MatchStats,
}

impl<'g, 'i> Run<'g, 'i> {
    fn new(grammar: &'g Grammar, config: EngineConfig, data: &'i [u8]) -> Self {
        let input = Input::new(data);
        Self {
            grammar,
            config,
            input,
            limit: input.end(),
            memo: MemoCache::with_capacity(grammar.len().min(1024)),
            active: HashSet::new(),
            depth: 0,
            stats: MatchStats::default(),
        }
    }

    /// Matches parser `id` at `at`, consulting and filling the cache.
    pub(crate) fn apply(&mut self, id: ParserId, at: Cursor) -> Step {
        let grammar = self.grammar;
        let node = grammar.node_unchecked(id);
        if let Node::Indirect(slot) = node {
            return self.apply_indirect(*slot, at);
        }

        if !self.config.memoize {
            self.stats.evaluations += 1;
            return self.evaluate_on_stack(id, node, at);
        }

        let key = MemoKey::new(id, at, self.limit);
        if let Some(step) = self.memo.get(&key) {
            self.stats.cache_hits += 1;
            trace!("cache hit: {} ({}) at {}", id, node.kind(), at);
            return step;
        }

        self.stats.evaluations += 1;
        let step = self.evaluate_on_stack(id, node, at);
        self.memo.insert(key, step.clone());
        step
    }

    /// Evaluation recurses natively once per nested parser, so the depth a
    /// grammar reaches is bounded by `max_recursion_depth`, not by the size of
    /// the calling thread's stack.
    fn evaluate_on_stack(&mut self, id: ParserId, node: &'g Node, at: Cursor) -> Step {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.evaluate(id, node, at))
    }

    /// Follows an indirection slot to its target.
    ///
    /// The target's cache entry is shared by every placeholder bound to it. A
    /// target re-entered at the same position before it returned is left
    /// recursion; nesting beyond the configured depth is a recursion-limit
    /// failure. Both are fatal.
    fn apply_indirect(&mut self, slot: SlotId, at: Cursor) -> Step {
        let target = self.grammar.resolve_unchecked(slot);
        let key = MemoKey::new(target, at, self.limit);

        if self.active.contains(&key) {
            trace!("left recursion through {} at {}", slot, at);
            return Err(Fail::new(at, FailureKind::LeftRecursion { slot }));
        }
        if self.depth >= self.config.max_recursion_depth {
            trace!("recursion limit {} hit at {}", self.config.max_recursion_depth, at);
            return Err(Fail::new(
                at,
                FailureKind::RecursionLimit {
                    limit: self.config.max_recursion_depth,
                },
            ));
        }

        self.active.insert(key);
        self.depth += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.depth);
        let step = self.apply(target, at);
        self.depth -= 1;
        self.active.remove(&key);
        step
    }

    fn evaluate(&mut self, id: ParserId, node: &'g Node, at: Cursor) -> Step {
        trace!("eval {} ({}) at {}", id, node.kind(), at);
        match node {
            Node::Token(bytes) => self.token(bytes, at),
            Node::Ch(c) => self.byte_if(at, |b| b == *c),
            Node::ChRange { low, high } => self.byte_if(at, |b| (*low..=*high).contains(&b)),
            Node::CharsetIn(set) => self.byte_if(at, |b| set.contains(b)),
            Node::Bits { width, signed } => self.bits(*width, *signed, at),
            Node::IntRange { base, low, high } => self.int_range(*base, *low, *high, at),
            Node::Whitespace(inner) => self.whitespace(*inner, at),
            Node::EndP => self.end(at),
            Node::NothingP => Err(Fail::no_match(at)),
            Node::EpsilonP => Ok(Match::absent(at)),

            Node::Left(a, b) => self.keep(&[*a, *b], 0, at),
            Node::Right(a, b) => self.keep(&[*a, *b], 1, at),
            Node::Middle(a, b, c) => self.keep(&[*a, *b, *c], 1, at),
            Node::Sequence(children) => self.sequence(children, at),
            Node::Choice(children) => self.choice(children, at),
            Node::ButNot(a, b) => self.butnot(*a, *b, at),
            Node::Difference(a, b) => self.difference(*a, *b, at),
            Node::Xor(a, b) => self.xor(*a, *b, at),
            Node::Many(inner) => self.repeat(*inner, None, 0, at),
            Node::Many1(inner) => self.repeat(*inner, None, 1, at),
            Node::RepeatN { inner, count } => self.repeat_n(*inner, *count, at),
            Node::Optional(inner) => self.optional(*inner, at),
            Node::Ignore(inner) => self.apply(*inner, at).map(|m| Match::absent(m.end)),
            Node::SepBy { item, sep } => self.repeat(*item, Some(*sep), 0, at),
            Node::SepBy1 { item, sep } => self.repeat(*item, Some(*sep), 1, at),
            Node::LengthValue { length, value } => self.length_value(*length, *value, at),
            Node::And(inner) => self.and(*inner, at),
            Node::Not(inner) => self.not(*inner, at),
            Node::Action { inner, action } => self.action(*inner, action, at),
            Node::AttrBool { inner, predicate } => self.attr_bool(*inner, predicate, at),

            // Dispatched by `apply` before reaching here.
            Node::Indirect(slot) => self.apply_indirect(*slot, at),
        }
    }
}
