//! Edit kinds.

use serde::Serialize;
use std::fmt;

/// Edits of a multi-valued property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ManyChangeKind {
    Add,
    Remove,
    Move,
    /// Replace one element in place.
    Set,
    /// Batch insert. Not supported.
    AddMany,
    /// Batch removal, clear included. Not supported.
    RemoveMany,
}

impl ManyChangeKind {
    /// Kinds drawn by random selection.
    pub const SUPPORTED: [ManyChangeKind; 4] = [
        ManyChangeKind::Add,
        ManyChangeKind::Remove,
        ManyChangeKind::Move,
        ManyChangeKind::Set,
    ];

    pub fn is_batch(self) -> bool {
        matches!(self, ManyChangeKind::AddMany | ManyChangeKind::RemoveMany)
    }
}

/// Edits of a single-valued property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SingleChangeKind {
    Set,
    /// Write the absent marker. Converted to `Unset` for properties that
    /// cannot hold it.
    SetToAbsent,
    Unset,
}

impl SingleChangeKind {
    pub const ALL: [SingleChangeKind; 3] = [
        SingleChangeKind::Set,
        SingleChangeKind::SetToAbsent,
        SingleChangeKind::Unset,
    ];
}

/// Any edit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    Many(ManyChangeKind),
    Single(SingleChangeKind),
}

impl ChangeKind {
    /// Whether the kind applies to multi-valued properties.
    pub fn is_many(&self) -> bool {
        matches!(self, ChangeKind::Many(_))
    }
}

impl From<ManyChangeKind> for ChangeKind {
    fn from(kind: ManyChangeKind) -> Self {
        ChangeKind::Many(kind)
    }
}

impl From<SingleChangeKind> for ChangeKind {
    fn from(kind: SingleChangeKind) -> Self {
        ChangeKind::Single(kind)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Many(ManyChangeKind::Add) => "ADD",
            ChangeKind::Many(ManyChangeKind::Remove) => "REMOVE",
            ChangeKind::Many(ManyChangeKind::Move) => "MOVE",
            ChangeKind::Many(ManyChangeKind::Set) => "SET",
            ChangeKind::Many(ManyChangeKind::AddMany) => "ADD_MANY",
            ChangeKind::Many(ManyChangeKind::RemoveMany) => "REMOVE_MANY",
            ChangeKind::Single(SingleChangeKind::Set) => "SET",
            ChangeKind::Single(SingleChangeKind::SetToAbsent) => "SET_NULL",
            ChangeKind::Single(SingleChangeKind::Unset) => "UNSET",
        };
        f.write_str(name)
    }
}
