//! Value types for model properties.
//!
//! Values are the atomic data stored in node properties. The model supports
//! scalar primitives (Bool, Int, Real, Text), enumeration literals and node
//! references. `Null` is the explicit absent marker.

use crate::{EnumId, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value that can be stored in a property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// Null/absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Real(f64),
    /// UTF-8 string.
    Text(String),
    /// Literal of an enumeration, by position in the enumeration's literal list.
    Literal(EnumId, u32),
    /// Reference to a node.
    Node(NodeId),
}

impl Value {
    /// Returns true if this is the absent marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as node ID if this is a Node value.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as boolean if this is a Bool value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer if this is an Int value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as string reference if this is a Text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Real(_) => "Real",
            Value::Text(_) => "Text",
            Value::Literal(..) => "Literal",
            Value::Node(_) => "Node",
        }
    }

    /// Check whether this value belongs to the domain of a primitive kind.
    /// `Null` belongs to no primitive domain.
    pub fn fits_primitive(&self, kind: PrimitiveKind) -> bool {
        matches!(
            (self, kind),
            (Value::Bool(_), PrimitiveKind::Bool)
                | (Value::Int(_), PrimitiveKind::Int)
                | (Value::Real(_), PrimitiveKind::Real)
                | (Value::Text(_), PrimitiveKind::Text)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Literal(e, i) => write!(f, "{}::{}", e, i),
            Value::Node(id) => write!(f, "#{}", id),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

/// Primitive attribute kinds a schema can declare.
///
/// `Timestamp` and `Bytes` are valid schema kinds, but no random value domain
/// is defined for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Real,
    Text,
    Timestamp,
    Bytes,
}

impl PrimitiveKind {
    /// The value a non-nullable attribute of this kind holds when unset.
    pub fn zero(&self) -> Value {
        match self {
            PrimitiveKind::Bool => Value::Bool(false),
            PrimitiveKind::Int | PrimitiveKind::Timestamp => Value::Int(0),
            PrimitiveKind::Real => Value::Real(0.0),
            PrimitiveKind::Text | PrimitiveKind::Bytes => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Bool => "Bool",
            PrimitiveKind::Int => "Int",
            PrimitiveKind::Real => "Real",
            PrimitiveKind::Text => "Text",
            PrimitiveKind::Timestamp => "Timestamp",
            PrimitiveKind::Bytes => "Bytes",
        };
        f.write_str(name)
    }
}
