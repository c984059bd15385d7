//! Common error types for the model accessor protocol.

use crate::{NodeId, PropertyId, TypeId};
use thiserror::Error;

/// Errors that can occur during model operations.
///
/// Two variants describe rejections a caller may treat as expected:
/// `HiddenTypeConstraint` (the model enforces a narrower type than the
/// schema declares) and `ValidationRejected` (a model-level rule the schema
/// does not expose). Every other variant signals a broken precondition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// Node not found.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Type not found.
    #[error("Type not found: {0}")]
    TypeNotFound(TypeId),

    /// Property not found in the schema.
    #[error("Property not found: {0}")]
    PropertyNotFound(PropertyId),

    /// Property does not belong to the node's type.
    #[error("Property {property} is not defined on node {node}")]
    PropertyNotOnNode { node: NodeId, property: PropertyId },

    /// Cannot instantiate an abstract type.
    #[error("Cannot instantiate abstract type: {0}")]
    AbstractType(String),

    /// Declared type mismatch.
    #[error("Type mismatch on {property}: expected {expected}, got {actual}")]
    TypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    /// The schema accepted the value but the model enforces a narrower type.
    #[error("Hidden type constraint on {property}: value must be an instance of {required}, got {actual}")]
    HiddenTypeConstraint {
        property: String,
        required: String,
        actual: String,
    },

    /// A model-level validation rule rejected the write.
    #[error("Write to {property} rejected by {rule}: {reason}")]
    ValidationRejected {
        property: String,
        rule: String,
        reason: String,
    },

    /// Null written to a property that cannot represent absence.
    #[error("Property {0} cannot be null")]
    NullNotAllowed(String),

    /// Single-valued access to a multi-valued property or vice versa.
    #[error("Arity mismatch on {property}: property is {expected}")]
    ArityMismatch {
        property: String,
        expected: &'static str,
    },

    /// List index out of bounds.
    #[error("Index {index} out of bounds for {property} (length {len})")]
    IndexOutOfBounds {
        property: String,
        index: usize,
        len: usize,
    },

    /// Containment write that would make a node its own ancestor.
    #[error("Recursive containment not allowed: {child} cannot be placed under {container}")]
    RecursiveContainment { container: NodeId, child: NodeId },

    /// Invalid operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl GraphError {
    /// True for rejections that leave the model unchanged and that callers
    /// may treat as an ordinary outcome.
    pub fn is_expected_rejection(&self) -> bool {
        matches!(
            self,
            GraphError::HiddenTypeConstraint { .. } | GraphError::ValidationRejected { .. }
        )
    }
}

/// Result type for model operations.
pub type GraphResult<T> = Result<T, GraphError>;
