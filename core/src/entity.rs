//! Entity structures for the model.
//!
//! A node owns the stored values of its properties and remembers the slot it
//! occupies in the containment tree.

use crate::{NodeId, PropertyId, TypeId, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Where a node sits in the containment tree.
///
/// A node with no slot is detached: it still exists but is not reachable
/// from the roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Slot {
    /// Top-level node at this position of the root list.
    Root(usize),
    /// Child of `container` through the containment `property`, at `index`
    /// (always 0 for single-valued containment).
    Contained {
        container: NodeId,
        property: PropertyId,
        index: usize,
    },
}

impl Slot {
    /// The containing node, if any.
    pub fn container(&self) -> Option<NodeId> {
        match self {
            Slot::Root(_) => None,
            Slot::Contained { container, .. } => Some(*container),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Root(i) => write!(f, "root[{}]", i),
            Slot::Contained {
                container,
                property,
                index,
            } => write!(f, "{}.{}[{}]", container, property, index),
        }
    }
}

/// The stored state of one property of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stored {
    Single(Value),
    Many(Vec<Value>),
}

/// A node in the model.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node.
    pub id: NodeId,
    /// Concrete type of this node (reference to registry).
    pub type_id: TypeId,
    /// Bumped on every change of a stored value.
    pub version: u64,
    /// Stored property values. Properties never written are absent and read
    /// back as their declared default.
    pub values: BTreeMap<PropertyId, Stored>,
    /// Containment slot, `None` when detached.
    pub slot: Option<Slot>,
}

impl Node {
    /// Create a new detached node with no stored values.
    pub fn new(id: NodeId, type_id: TypeId) -> Self {
        Self {
            id,
            type_id,
            version: 1,
            values: BTreeMap::new(),
            slot: None,
        }
    }

    /// Get the stored state of a property.
    pub fn get_stored(&self, property: PropertyId) -> Option<&Stored> {
        self.values.get(&property)
    }

    /// Get the stored list of a multi-valued property, creating it if needed.
    pub fn list_mut(&mut self, property: PropertyId) -> &mut Vec<Value> {
        self.version += 1;
        let stored = self
            .values
            .entry(property)
            .or_insert_with(|| Stored::Many(Vec::new()));
        if let Stored::Single(_) = stored {
            *stored = Stored::Many(Vec::new());
        }
        match stored {
            Stored::Many(items) => items,
            Stored::Single(_) => unreachable!("replaced by an empty list above"),
        }
    }

    /// Store a single value.
    pub fn set_single(&mut self, property: PropertyId, value: Value) {
        self.values.insert(property, Stored::Single(value));
        self.version += 1;
    }

    /// Remove the stored state of a property, returning it.
    pub fn clear_stored(&mut self, property: PropertyId) -> Option<Stored> {
        let result = self.values.remove(&property);
        if result.is_some() {
            self.version += 1;
        }
        result
    }

    /// The containing node, if any.
    pub fn container(&self) -> Option<NodeId> {
        self.slot.and_then(|s| s.container())
    }
}
