//! Identity types for model entities and schema elements.
//!
//! All identifiers are plain integers that are:
//! - Unique within their namespace
//! - Immutable once assigned
//! - Ordered, so that maps keyed by them iterate deterministically

use serde::Serialize;
use std::fmt;

/// Unique identifier for a node of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifier for a node type in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position of this type in the registry's dense type table.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifier for a property descriptor in the registry.
///
/// Property ids are global: an inherited property keeps the id it was
/// declared with on its owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PropertyId(pub u32);

impl PropertyId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier for an enumeration in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnumId(pub u32);

impl EnumId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EnumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "en{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_equality() {
        let id1 = NodeId::new(1);
        let id2 = NodeId::new(1);
        let id3 = NodeId::new(2);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_ids_order_by_raw_value() {
        assert!(NodeId::new(1) < NodeId::new(2));
        assert!(TypeId::new(0) < TypeId::new(3));
        assert!(PropertyId::new(7) > PropertyId::new(2));
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(NodeId::new(4).to_string(), "n4");
        assert_eq!(TypeId::new(2).to_string(), "t2");
        assert_eq!(PropertyId::new(9).to_string(), "p9");
        assert_eq!(EnumId::new(1).to_string(), "en1");
    }
}
