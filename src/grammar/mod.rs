//! Grammar representation.
//!
//! A grammar is an arena of [`Node`]s addressed by [`ParserId`]. It is assembled
//! through a [`GrammarBuilder`] (one constructor per combinator, see
//! [`builders`]) and frozen with [`GrammarBuilder::finish`] into an immutable
//! [`Grammar`] that any number of engine runs can share.
//!
//! ## Two-phase build
//!
//! Recursive grammars are written with [`GrammarBuilder::indirect`], which hands
//! out a placeholder whose target is supplied later with
//! [`GrammarBuilder::bind_indirect`]. Freezing checks that every placeholder was
//! bound; after that, the grammar has no mutators at all.
//!
//! ```rust
//! use bitpeg::GrammarBuilder;
//!
//! // parens := '(' parens ')' parens | epsilon
//! let mut g = GrammarBuilder::new();
//! let parens = g.indirect();
//! let open = g.ch(b'(');
//! let close = g.ch(b')');
//! let nested = g.sequence(&[open, parens, close, parens]).unwrap();
//! let empty = g.epsilon_p();
//! let body = g.choice(&[nested, empty]).unwrap();
//! g.bind_indirect(parens, body).unwrap();
//! let end = g.end_p();
//! let root = g.left(parens, end).unwrap();
//! let grammar = g.finish().unwrap();
//!
//! assert!(grammar.parse(root, b"(()())").unwrap().is_success());
//! assert!(!grammar.parse(root, b"(()").unwrap().is_success());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{Engine, ParseResult};
use crate::errors::GrammarError;

pub mod builders;
pub mod charset;
mod indirect;
mod node;

pub use charset::{Charset, WHITESPACE};
pub use node::Node;

use indirect::IndirectionTable;

static NEXT_GRAMMAR_ID: AtomicU32 = AtomicU32::new(0);

// ============================================================================
// HANDLES
// ============================================================================

/// Handle to a node in a specific grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParserId {
    grammar: u32,
    index: u32,
}

impl ParserId {
    /// Position of the node in its grammar's arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ParserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Identifier of an indirection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub(crate) u32);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Mutable grammar under construction.
#[derive(Debug)]
pub struct GrammarBuilder {
    id: u32,
    nodes: Vec<Node>,
    indirections: IndirectionTable,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAMMAR_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            indirections: IndirectionTable::default(),
        }
    }

    /// Number of nodes built so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node built by this builder.
    pub fn node(&self, id: ParserId) -> Option<&Node> {
        self.owns(id).then(|| &self.nodes[id.index()])
    }

    fn owns(&self, id: ParserId) -> bool {
        id.grammar == self.id && id.index() < self.nodes.len()
    }

    pub(crate) fn check(&self, id: ParserId) -> Result<ParserId, GrammarError> {
        if self.owns(id) {
            Ok(id)
        } else {
            Err(GrammarError::ForeignParser { parser: id })
        }
    }

    /// Appends a node after checking that all its children belong here.
    pub(crate) fn push(&mut self, node: Node) -> Result<ParserId, GrammarError> {
        for child in node.children() {
            self.check(child)?;
        }
        let id = ParserId {
            grammar: self.id,
            index: self.nodes.len() as u32,
        };
        self.nodes.push(node);
        Ok(id)
    }

    /// Appends a leaf node, which has no children to check.
    pub(crate) fn push_leaf(&mut self, node: Node) -> ParserId {
        debug_assert!(node.children().is_empty());
        let id = ParserId {
            grammar: self.id,
            index: self.nodes.len() as u32,
        };
        self.nodes.push(node);
        id
    }

    // ------------------------------------------------------------------------
    // Indirection lifecycle
    // ------------------------------------------------------------------------

    /// Allocates an indirection slot and returns its placeholder parser.
    pub fn indirect(&mut self) -> ParserId {
        let slot = self.indirections.allocate();
        self.push_leaf(Node::Indirect(slot))
    }

    /// Binds the placeholder returned by [`indirect`](Self::indirect) to `target`.
    ///
    /// Each placeholder is bound exactly once; rebinding is an error.
    pub fn bind_indirect(&mut self, indirect: ParserId, target: ParserId) -> Result<(), GrammarError> {
        let slot = self
            .slot_of(self.check(indirect)?)
            .ok_or(GrammarError::NotIndirect { parser: indirect })?;
        self.check(target)?;
        self.indirections.bind(slot, target)
    }

    /// The slot behind an indirect placeholder.
    pub fn slot_of(&self, id: ParserId) -> Option<SlotId> {
        match self.node(id)? {
            Node::Indirect(slot) => Some(*slot),
            _ => None,
        }
    }

    /// Target of a bound slot.
    pub fn slot_target(&self, slot: SlotId) -> Option<ParserId> {
        self.indirections.target(slot)
    }

    /// Slots allocated but not yet bound.
    pub fn unbound_slots(&self) -> Vec<SlotId> {
        self.indirections.unbound()
    }

    pub fn all_bound(&self) -> bool {
        self.unbound_slots().is_empty()
    }

    /// Freezes the grammar. Fails if any indirection slot is unbound.
    pub fn finish(self) -> Result<Grammar, GrammarError> {
        let slot_count = self.indirections.len();
        let slots = self.indirections.freeze()?;
        debug!(
            "grammar {} frozen: {} nodes, {} indirection slots",
            self.id,
            self.nodes.len(),
            slot_count
        );
        Ok(Grammar {
            id: self.id,
            nodes: self.nodes,
            slots,
        })
    }
}

// ============================================================================
// FROZEN GRAMMAR
// ============================================================================

/// An immutable grammar, safe to share between threads and runs.
#[derive(Debug)]
pub struct Grammar {
    id: u32,
    nodes: Vec<Node>,
    slots: Vec<ParserId>,
}

impl Grammar {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ParserId) -> bool {
        id.grammar == self.id && id.index() < self.nodes.len()
    }

    pub fn node(&self, id: ParserId) -> Option<&Node> {
        self.contains(id).then(|| &self.nodes[id.index()])
    }

    /// Node lookup for ids already validated against this grammar.
    pub(crate) fn node_unchecked(&self, id: ParserId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Target parser of an indirection slot, or `None` for a slot this
    /// grammar never allocated.
    pub fn resolve(&self, slot: SlotId) -> Option<ParserId> {
        self.slots.get(slot.index()).copied()
    }

    /// Slot lookup for slots taken from this grammar's own `Indirect` nodes.
    pub(crate) fn resolve_unchecked(&self, slot: SlotId) -> ParserId {
        self.slots[slot.index()]
    }

    pub(crate) fn check(&self, id: ParserId) -> Result<ParserId, GrammarError> {
        if self.contains(id) {
            Ok(id)
        } else {
            Err(GrammarError::ForeignParser { parser: id })
        }
    }

    /// Matches `root` against `input` with the default engine configuration.
    pub fn parse(&self, root: ParserId, input: &[u8]) -> Result<ParseResult, GrammarError> {
        Engine::new(self).run(root, input)
    }

    /// Matches `root` against `input` with an explicit configuration.
    pub fn parse_with(
        &self,
        root: ParserId,
        input: &[u8],
        config: EngineConfig,
    ) -> Result<ParseResult, GrammarError> {
        Engine::with_config(self, config).run(root, input)
    }
}
