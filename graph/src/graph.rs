//! Core model storage, traversal and read access.

use crate::guard::WriteGuards;
use crate::notify::{Notification, NotificationKind};
use modelfuzz_core::{GraphError, GraphResult, Node, NodeId, PropertyId, Slot, Stored, TypeId, Value};
use modelfuzz_registry::{PropertyDef, Registry};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// ID allocator for nodes.
#[derive(Debug)]
struct IdAllocator {
    next_node_id: u64,
}

impl IdAllocator {
    fn new() -> Self {
        Self { next_node_id: 1 }
    }

    fn alloc_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        id
    }
}

/// The in-memory model.
///
/// Nodes are kept in id order and the roots in insertion order, so every
/// traversal is deterministic.
#[derive(Debug)]
pub struct Graph {
    /// Schema the model conforms to.
    pub(crate) registry: Arc<Registry>,
    /// Node storage, including detached nodes.
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    /// Top-level nodes, in order.
    pub(crate) roots: Vec<NodeId>,
    /// ID allocator
    id_alloc: IdAllocator,
    /// Runtime write restrictions and validation rules.
    pub(crate) guards: WriteGuards,
    /// Recorded change notifications.
    pub(crate) notifications: Vec<Notification>,
    /// Whether notifications are recorded.
    pub(crate) recording: bool,
}

impl Graph {
    /// Create a new empty model for a schema.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            nodes: BTreeMap::new(),
            roots: Vec::new(),
            id_alloc: IdAllocator::new(),
            guards: WriteGuards::default(),
            notifications: Vec::new(),
            recording: false,
        }
    }

    /// The schema of this model.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A shared handle on the schema of this model.
    pub fn registry_handle(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    // ==================== Node Operations ====================

    /// Create a new detached node of a concrete type.
    pub fn create_node(&mut self, type_id: TypeId) -> GraphResult<NodeId> {
        let type_def = self
            .registry
            .get_type(type_id)
            .ok_or(GraphError::TypeNotFound(type_id))?;
        if type_def.is_abstract {
            return Err(GraphError::AbstractType(type_def.name.clone()));
        }

        let id = self.id_alloc.alloc_node_id();
        self.nodes.insert(id, Node::new(id, type_id));
        tracing::trace!(node = %id, type_name = %type_def.name, "created node");
        Ok(id)
    }

    /// Create a new node and append it to the roots.
    pub fn add_root(&mut self, type_id: TypeId) -> GraphResult<NodeId> {
        let id = self.create_node(type_id)?;
        let index = self.roots.len();
        self.roots.push(id);
        self.node_mut(id)?.slot = Some(Slot::Root(index));
        self.notify(Notification::new(NotificationKind::Add, None, None).with_new(Value::Node(id)).at(index));
        Ok(id)
    }

    /// Drop every node that nothing live can reach any more.
    ///
    /// A node is live when it is a root, or is held by a live node through
    /// any node-valued property, or contains a live node. Detached nodes
    /// still referenced from the live part of the model are kept. Returns
    /// the number of nodes dropped.
    pub fn collect_garbage(&mut self) -> usize {
        let mut live: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack: Vec<NodeId> = self.roots.clone();
        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            stack.extend(node.container());
            for stored in node.values.values() {
                match stored {
                    Stored::Single(value) => stack.extend(value.as_node()),
                    Stored::Many(values) => stack.extend(values.iter().filter_map(Value::as_node)),
                }
            }
        }

        let before = self.nodes.len();
        self.nodes.retain(|id, _| live.contains(id));
        let dropped = before - self.nodes.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = self.nodes.len(), "collected unreachable nodes");
        }
        dropped
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// The root nodes, in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes, including detached ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The concrete type of a node.
    pub fn type_of(&self, id: NodeId) -> GraphResult<TypeId> {
        Ok(self.node_ref(id)?.type_id)
    }

    /// The slot a node occupies, `None` when detached.
    pub fn slot_of(&self, id: NodeId) -> GraphResult<Option<Slot>> {
        Ok(self.node_ref(id)?.slot)
    }

    /// The node containing `id`, if any.
    pub fn container_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.container())
    }

    /// The node itself followed by its containers up to the top.
    ///
    /// The walk is bounded by the number of nodes, so a corrupted parent
    /// chain cannot loop forever.
    pub fn ancestors_and_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.container_of(current) {
            if chain.len() > self.nodes.len() {
                tracing::warn!(node = %id, "containment chain longer than the model");
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Every node reachable from the roots through containment, in
    /// depth-first pre-order: roots in order, then containment properties in
    /// schema order, then list order.
    pub fn all_contents(&self) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            result.push(id);

            let mut children = Vec::new();
            for def in self.registry.containment_properties(node.type_id) {
                match node.get_stored(def.id) {
                    Some(Stored::Single(Value::Node(child))) => children.push(*child),
                    Some(Stored::Many(items)) => {
                        children.extend(items.iter().filter_map(Value::as_node))
                    }
                    _ => {}
                }
            }
            stack.extend(children.into_iter().rev());
        }

        result
    }

    // ==================== Read Access ====================

    /// Look up a property and check it is defined on the node's type.
    pub(crate) fn property_on<'r>(
        &self,
        registry: &'r Registry,
        node: NodeId,
        property: PropertyId,
    ) -> GraphResult<&'r PropertyDef> {
        let type_id = self.type_of(node)?;
        let def = registry
            .get_property(property)
            .ok_or(GraphError::PropertyNotFound(property))?;
        if !registry.is_subtype(type_id, def.owner) {
            return Err(GraphError::PropertyNotOnNode { node, property });
        }
        Ok(def)
    }

    /// Read a single-valued property. Unwritten properties read as their
    /// declared default; container properties read as the current container
    /// when the node sits in the mirrored containment.
    pub fn get(&self, node: NodeId, property: PropertyId) -> GraphResult<Value> {
        let def = self.property_on(&self.registry, node, property)?;
        if def.many {
            return Err(GraphError::ArityMismatch {
                property: def.name.clone(),
                expected: "multi-valued",
            });
        }
        Ok(self.read_single(self.node_ref(node)?, def))
    }

    /// Read a multi-valued property.
    pub fn list(&self, node: NodeId, property: PropertyId) -> GraphResult<&[Value]> {
        let def = self.property_on(&self.registry, node, property)?;
        if !def.many {
            return Err(GraphError::ArityMismatch {
                property: def.name.clone(),
                expected: "single-valued",
            });
        }
        Ok(self.read_list(self.node_ref(node)?, def.id))
    }

    /// Current length of a multi-valued property.
    pub fn len(&self, node: NodeId, property: PropertyId) -> GraphResult<usize> {
        Ok(self.list(node, property)?.len())
    }

    pub(crate) fn read_single(&self, node: &Node, def: &PropertyDef) -> Value {
        if def.container {
            return match node.slot {
                Some(Slot::Contained {
                    container,
                    property,
                    ..
                }) if Some(property) == def.opposite => Value::Node(container),
                _ => Value::Null,
            };
        }
        match node.get_stored(def.id) {
            Some(Stored::Single(value)) => value.clone(),
            _ => def.default_value(),
        }
    }

    pub(crate) fn read_list<'n>(&self, node: &'n Node, property: PropertyId) -> &'n [Value] {
        match node.get_stored(property) {
            Some(Stored::Many(items)) => items,
            _ => &[],
        }
    }

    // ==================== Slot Bookkeeping ====================

    /// Remove a node from whatever slot it occupies.
    pub(crate) fn detach(&mut self, id: NodeId) -> GraphResult<()> {
        let slot = self.node_ref(id)?.slot;
        match slot {
            None => return Ok(()),
            Some(Slot::Root(index)) => {
                if index < self.roots.len() {
                    self.roots.remove(index);
                }
                self.renumber_roots();
                self.notify(
                    Notification::new(NotificationKind::Remove, None, None)
                        .with_old(Value::Node(id))
                        .at(index),
                );
            }
            Some(Slot::Contained {
                container,
                property,
                index,
            }) => {
                let many = self
                    .registry
                    .get_property(property)
                    .map(|p| p.many)
                    .unwrap_or(false);
                if many {
                    let list = self.node_mut(container)?.list_mut(property);
                    if index < list.len() {
                        list.remove(index);
                    }
                    self.renumber_list(container, property)?;
                    self.notify(
                        Notification::new(NotificationKind::Remove, Some(container), Some(property))
                            .with_old(Value::Node(id))
                            .at(index),
                    );
                } else {
                    self.node_mut(container)?.clear_stored(property);
                    self.notify(
                        Notification::new(NotificationKind::Set, Some(container), Some(property))
                            .with_old(Value::Node(id)),
                    );
                }
            }
        }
        self.node_mut(id)?.slot = None;
        Ok(())
    }

    /// Rewrite the slots of every child of a containment list.
    pub(crate) fn renumber_list(&mut self, container: NodeId, property: PropertyId) -> GraphResult<()> {
        let children: Vec<NodeId> = self
            .read_list(self.node_ref(container)?, property)
            .iter()
            .filter_map(Value::as_node)
            .collect();
        for (index, child) in children.into_iter().enumerate() {
            self.node_mut(child)?.slot = Some(Slot::Contained {
                container,
                property,
                index,
            });
        }
        Ok(())
    }

    pub(crate) fn renumber_roots(&mut self) {
        for (index, id) in self.roots.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.slot = Some(Slot::Root(index));
            }
        }
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        if self.recording {
            self.notifications.push(notification);
        }
    }
}
