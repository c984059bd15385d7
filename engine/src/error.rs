//! Engine error types.

use crate::kinds::ChangeKind;
use modelfuzz_core::{EnumId, GraphError, PrimitiveKind};
use modelfuzz_registry::RegistryError;
use thiserror::Error;

/// Result type for engine operations.
pub type FuzzResult<T> = Result<T, FuzzError>;

/// Fatal engine errors.
///
/// Rejected or converted edits are not errors; they are reported through
/// `ChangeOutcome`.
#[derive(Debug, Error)]
pub enum FuzzError {
    #[error("Model has no node with a mutable property")]
    EmptyModel,

    #[error("Cannot generate a value of kind {kind} for {property}")]
    UnsupportedPrimitive {
        property: String,
        kind: PrimitiveKind,
    },

    #[error("Enumeration {enum_id} of {property} has no literals to pick from")]
    NoLiterals { property: String, enum_id: EnumId },

    #[error("Change kind {kind} is not supported (on {property})")]
    UnsupportedChange { property: String, kind: ChangeKind },

    #[error("Change kind {kind} does not apply to {arity} property {property}")]
    KindMismatch {
        property: String,
        kind: ChangeKind,
        arity: &'static str,
    },

    #[error("Undo was requested for {property} but never performed")]
    UndoNotHonored { property: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Schema(#[from] RegistryError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FuzzError {
    pub fn unsupported_primitive(property: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::UnsupportedPrimitive {
            property: property.into(),
            kind,
        }
    }

    pub fn no_literals(property: impl Into<String>, enum_id: EnumId) -> Self {
        Self::NoLiterals {
            property: property.into(),
            enum_id,
        }
    }

    pub fn unsupported_change(property: impl Into<String>, kind: ChangeKind) -> Self {
        Self::UnsupportedChange {
            property: property.into(),
            kind,
        }
    }

    pub fn kind_mismatch(property: impl Into<String>, kind: ChangeKind, many: bool) -> Self {
        Self::KindMismatch {
            property: property.into(),
            kind,
            arity: if many { "multi-valued" } else { "single-valued" },
        }
    }

    pub fn undo_not_honored(property: impl Into<String>) -> Self {
        Self::UndoNotHonored {
            property: property.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
