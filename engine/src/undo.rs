//! One-level undo.
//!
//! A caller asks for undo per call through `ChangeRequest`. The engine
//! captures what reversing the edit needs before applying it, reverses it
//! right after a successful apply, and reports what happened through
//! `UndoOutcome`.

use crate::model::Model;
use modelfuzz_core::{GraphResult, NodeId, PropertyId, Slot, Value};
use serde::Serialize;

/// What the caller wants done with the next edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ChangeRequest {
    #[default]
    Apply,
    /// Apply the edit, then immediately reverse it.
    ApplyAndUndo,
}

impl ChangeRequest {
    pub fn wants_undo(&self) -> bool {
        matches!(self, ChangeRequest::ApplyAndUndo)
    }
}

/// What became of a requested undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UndoOutcome {
    NotRequested,
    /// The edit was applied and reversed.
    Reverted,
    /// Nothing was applied, so nothing needed reversing.
    NothingToRevert,
    /// Undo is not available for the edit kind.
    Unsupported,
}

/// Undo requested for the edit in progress. Must be consumed exactly once
/// before the edit returns.
#[derive(Debug)]
pub(crate) struct PendingUndo {
    property: String,
}

impl PendingUndo {
    pub(crate) fn arm(request: ChangeRequest, property: &str) -> Option<Self> {
        request.wants_undo().then(|| Self {
            property: property.to_string(),
        })
    }

    pub(crate) fn property(&self) -> &str {
        &self.property
    }
}

/// Consume the token of an edit that changed nothing.
pub(crate) fn settle(pending: &mut Option<PendingUndo>, outcome: UndoOutcome) -> UndoOutcome {
    match pending.take() {
        Some(_) => outcome,
        None => UndoOutcome::NotRequested,
    }
}

/// The inverse of one primitive edit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reversal {
    /// Inverse of an insert.
    Remove { index: usize },
    /// Inverse of a remove.
    Insert { index: usize, value: Value },
    /// Inverse of a move.
    Move { to: usize, from: usize },
    /// Inverse of a replace.
    Replace { index: usize, value: Value },
    /// Inverse of any single-valued write.
    Set { value: Value },
}

/// Everything needed to put the model back as it was before one edit:
/// the inverse edit, plus the slots of nodes the edit may relocate as a side
/// effect of containment.
#[derive(Debug, Clone)]
pub(crate) struct Inverse {
    node: NodeId,
    property: PropertyId,
    reversal: Reversal,
    slots: Vec<(NodeId, Option<Slot>)>,
}

impl Inverse {
    pub(crate) fn new(node: NodeId, property: PropertyId, reversal: Reversal) -> Self {
        Self {
            node,
            property,
            reversal,
            slots: Vec::new(),
        }
    }

    /// Remember where `node` sits now. Slots are restored in capture order.
    pub(crate) fn capture_slot<M: Model + ?Sized>(&mut self, model: &M, node: NodeId) -> GraphResult<()> {
        if !self.slots.iter().any(|(n, _)| *n == node) {
            let slot = model.slot_of(node)?;
            self.slots.push((node, slot));
        }
        Ok(())
    }

    /// Apply the inverse edit, then put every captured node back into its
    /// slot.
    pub(crate) fn apply<M: Model + ?Sized>(self, model: &mut M) -> GraphResult<()> {
        let (node, property) = (self.node, self.property);
        match self.reversal {
            Reversal::Remove { index } => {
                model.remove(node, property, index)?;
            }
            Reversal::Insert { index, value } => model.insert(node, property, index, value)?,
            Reversal::Move { to, from } => {
                model.move_element(node, property, to, from)?;
            }
            Reversal::Replace { index, value } => {
                model.replace(node, property, index, value)?;
            }
            Reversal::Set { value } => model.set(node, property, value)?,
        }
        for (moved, slot) in self.slots {
            model.place(moved, slot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_only_when_requested() {
        assert!(PendingUndo::arm(ChangeRequest::Apply, "books").is_none());
        let pending = PendingUndo::arm(ChangeRequest::ApplyAndUndo, "books");
        assert_eq!(pending.as_ref().map(|p| p.property()), Some("books"));
    }

    #[test]
    fn test_settle_consumes_token() {
        let mut pending = PendingUndo::arm(ChangeRequest::ApplyAndUndo, "books");

        assert_eq!(settle(&mut pending, UndoOutcome::NothingToRevert), UndoOutcome::NothingToRevert);
        assert!(pending.is_none());
        assert_eq!(settle(&mut pending, UndoOutcome::NothingToRevert), UndoOutcome::NotRequested);
    }
}
