//! Packrat memoization for one engine run.

use std::collections::HashMap;

use crate::engine::Step;
use crate::grammar::ParserId;
use crate::input::Cursor;

/// Cache key. The window end is part of the key because the same parser at the
/// same position can see a different end of input inside a `length_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    pub(crate) node: ParserId,
    pub(crate) at: Cursor,
    pub(crate) limit: Cursor,
}

impl MemoKey {
    pub(crate) fn new(node: ParserId, at: Cursor, limit: Cursor) -> Self {
        Self { node, at, limit }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoCache {
    entries: HashMap<MemoKey, Step>,
}

impl MemoCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn get(&self, key: &MemoKey) -> Option<Step> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn insert(&mut self, key: MemoKey, step: Step) {
        self.entries.insert(key, step);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
