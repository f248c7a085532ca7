//! The indirection table behind `indirect` / `bind_indirect`.
//!
//! Recursive grammars never hold cyclic references: a recursive edge is a
//! [`SlotId`] that resolves to its target only through this table. The table is
//! mutable while the grammar is being built and frozen into a plain lookup vector
//! by [`IndirectionTable::freeze`].

use crate::errors::GrammarError;
use crate::grammar::{ParserId, SlotId};

#[derive(Debug, Default)]
pub(crate) struct IndirectionTable {
    slots: Vec<Option<ParserId>>,
}

impl IndirectionTable {
    pub(crate) fn allocate(&mut self) -> SlotId {
        let slot = SlotId(self.slots.len() as u32);
        self.slots.push(None);
        slot
    }

    /// Binds `slot` to `target`; binding twice is an error.
    pub(crate) fn bind(&mut self, slot: SlotId, target: ParserId) -> Result<(), GrammarError> {
        let entry = &mut self.slots[slot.index()];
        if entry.is_some() {
            return Err(GrammarError::AlreadyBound { slot });
        }
        *entry = Some(target);
        Ok(())
    }

    pub(crate) fn target(&self, slot: SlotId) -> Option<ParserId> {
        self.slots.get(slot.index()).copied().flatten()
    }

    pub(crate) fn unbound(&self) -> Vec<SlotId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, target)| target.is_none())
            .map(|(i, _)| SlotId(i as u32))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Resolves every slot, failing on the first unbound one.
    pub(crate) fn freeze(self) -> Result<Vec<ParserId>, GrammarError> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(i, target)| {
                target.ok_or(GrammarError::UnboundSlot {
                    slot: SlotId(i as u32),
                })
            })
            .collect()
    }
}
