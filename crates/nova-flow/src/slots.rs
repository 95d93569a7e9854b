//! Bit addresses for tracked variables.
//!
//! Addresses are handed out in declaration order and reclaimed when the
//! declaring scope ends, so a block's locals reuse the addresses of a sibling
//! block's. Every (re)allocation bumps the address' generation; a variable
//! whose recorded generation no longer matches is out of scope and reads as
//! untracked.

use std::collections::HashMap;

use nova_hir::body::VarId;

#[derive(Debug, Clone, Copy)]
struct Entry {
    var: VarId,
    generation: u32,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    generation: u32,
}

#[derive(Debug, Default)]
pub(crate) struct SlotArena {
    entries: Vec<Entry>,
    next: usize,
    slots: HashMap<VarId, Slot>,
}

impl SlotArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// First free address.
    pub(crate) fn next(&self) -> usize {
        self.next
    }

    pub(crate) fn alloc(&mut self, var: VarId) -> usize {
        let index = self.next;
        let generation = match self.entries.get_mut(index) {
            Some(entry) => {
                entry.generation += 1;
                entry.var = var;
                entry.generation
            }
            None => {
                self.entries.push(Entry { var, generation: 0 });
                0
            }
        };
        self.slots.insert(var, Slot { index, generation });
        self.next += 1;
        index
    }

    /// Releases every address at or above `mark`.
    pub(crate) fn truncate(&mut self, mark: usize) {
        debug_assert!(mark <= self.next);
        self.next = mark.min(self.next);
    }

    pub(crate) fn address_of(&self, var: VarId) -> Option<usize> {
        let slot = self.slots.get(&var)?;
        let entry = self.entries.get(slot.index)?;
        let live =
            slot.index < self.next && entry.generation == slot.generation && entry.var == var;
        live.then_some(slot.index)
    }

    pub(crate) fn var_at(&self, index: usize) -> Option<VarId> {
        if index < self.next {
            self.entries.get(index).map(|entry| entry.var)
        } else {
            None
        }
    }
}
