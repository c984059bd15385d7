//! The accessor protocol the engine drives a model through.

use modelfuzz_core::{GraphResult, NodeId, PropertyId, Slot, TypeId, Value};
use modelfuzz_graph::Graph;
use modelfuzz_registry::Registry;
use std::sync::Arc;

/// A mutable model described by a schema.
///
/// Writes must be atomic: a rejected write leaves the model unchanged.
/// Rejections the engine should treat as expected are reported as
/// `GraphError::HiddenTypeConstraint` or `GraphError::ValidationRejected`.
pub trait Model {
    /// The schema of this model.
    fn registry(&self) -> Arc<Registry>;

    /// Every node reachable from the roots, in a stable order.
    fn all_contents(&self) -> Vec<NodeId>;

    fn type_of(&self, node: NodeId) -> GraphResult<TypeId>;

    fn container_of(&self, node: NodeId) -> Option<NodeId>;

    fn slot_of(&self, node: NodeId) -> GraphResult<Option<Slot>>;

    fn get(&self, node: NodeId, property: PropertyId) -> GraphResult<Value>;

    fn list(&self, node: NodeId, property: PropertyId) -> GraphResult<Vec<Value>>;

    fn len(&self, node: NodeId, property: PropertyId) -> GraphResult<usize>;

    fn set(&mut self, node: NodeId, property: PropertyId, value: Value) -> GraphResult<()>;

    fn unset(&mut self, node: NodeId, property: PropertyId) -> GraphResult<()>;

    fn insert(&mut self, node: NodeId, property: PropertyId, index: usize, value: Value) -> GraphResult<()>;

    fn remove(&mut self, node: NodeId, property: PropertyId, index: usize) -> GraphResult<Value>;

    /// Move the element at `from` to `to`.
    fn move_element(&mut self, node: NodeId, property: PropertyId, to: usize, from: usize) -> GraphResult<Value>;

    fn replace(&mut self, node: NodeId, property: PropertyId, index: usize, value: Value) -> GraphResult<Value>;

    /// Create a detached node of a concrete type.
    fn create_node(&mut self, type_id: TypeId) -> GraphResult<NodeId>;

    /// Put a node back into an exact slot (`None` detaches).
    fn place(&mut self, node: NodeId, slot: Option<Slot>) -> GraphResult<()>;

    /// Drop nodes nothing live can reach. Returns how many were dropped.
    fn collect_garbage(&mut self) -> usize;
}

impl Model for Graph {
    fn registry(&self) -> Arc<Registry> {
        self.registry_handle()
    }

    fn all_contents(&self) -> Vec<NodeId> {
        Graph::all_contents(self)
    }

    fn type_of(&self, node: NodeId) -> GraphResult<TypeId> {
        Graph::type_of(self, node)
    }

    fn container_of(&self, node: NodeId) -> Option<NodeId> {
        Graph::container_of(self, node)
    }

    fn slot_of(&self, node: NodeId) -> GraphResult<Option<Slot>> {
        Graph::slot_of(self, node)
    }

    fn get(&self, node: NodeId, property: PropertyId) -> GraphResult<Value> {
        Graph::get(self, node, property)
    }

    fn list(&self, node: NodeId, property: PropertyId) -> GraphResult<Vec<Value>> {
        Ok(Graph::list(self, node, property)?.to_vec())
    }

    fn len(&self, node: NodeId, property: PropertyId) -> GraphResult<usize> {
        Graph::len(self, node, property)
    }

    fn set(&mut self, node: NodeId, property: PropertyId, value: Value) -> GraphResult<()> {
        Graph::set(self, node, property, value)
    }

    fn unset(&mut self, node: NodeId, property: PropertyId) -> GraphResult<()> {
        Graph::unset(self, node, property)
    }

    fn insert(&mut self, node: NodeId, property: PropertyId, index: usize, value: Value) -> GraphResult<()> {
        Graph::insert(self, node, property, index, value)
    }

    fn remove(&mut self, node: NodeId, property: PropertyId, index: usize) -> GraphResult<Value> {
        Graph::remove(self, node, property, index)
    }

    fn move_element(&mut self, node: NodeId, property: PropertyId, to: usize, from: usize) -> GraphResult<Value> {
        Graph::move_element(self, node, property, to, from)
    }

    fn replace(&mut self, node: NodeId, property: PropertyId, index: usize, value: Value) -> GraphResult<Value> {
        Graph::replace(self, node, property, index, value)
    }

    fn create_node(&mut self, type_id: TypeId) -> GraphResult<NodeId> {
        Graph::create_node(self, type_id)
    }

    fn place(&mut self, node: NodeId, slot: Option<Slot>) -> GraphResult<()> {
        Graph::place(self, node, slot)
    }

    fn collect_garbage(&mut self) -> usize {
        Graph::collect_garbage(self)
    }
}
