//! Write operations.
//!
//! Every write is checked completely before anything is mutated, so a
//! rejected write leaves the model untouched. Writes to containment and
//! container properties relocate nodes and keep their slots consistent.

use crate::notify::{Notification, NotificationKind};
use crate::Graph;
use modelfuzz_core::{GraphError, GraphResult, NodeId, PropertyId, Slot, Stored, Value};
use modelfuzz_registry::{PropertyDef, PropertyTarget, Registry};
use std::sync::Arc;

impl Graph {
    // ==================== Single-Valued ====================

    /// Write a single-valued property.
    ///
    /// Setting a containment property moves the child out of its previous
    /// slot; setting a container property moves the node into the mirrored
    /// containment of the new parent. Null detaches.
    pub fn set(&mut self, node: NodeId, property: PropertyId, value: Value) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let def = self.property_on(&registry, node, property)?;
        require_single(def)?;
        self.check_value(&registry, def, &value, false)?;
        self.guards.check(self, node, def, &value)?;
        self.check_containment(node, def, &value)?;

        let old = self.read_single(self.node_ref(node)?, def);
        if def.containment {
            self.set_containment_single(node, def, value)?;
        } else if def.container {
            self.set_container(&registry, node, def, value)?;
        } else {
            self.node_mut(node)?.set_single(def.id, value.clone());
            self.notify(
                Notification::new(NotificationKind::Set, Some(node), Some(def.id))
                    .with_old(old)
                    .with_new(value),
            );
        }
        Ok(())
    }

    /// Reset a property to its default. Lists become empty, contained
    /// children become detached, a container property detaches the node.
    pub fn unset(&mut self, node: NodeId, property: PropertyId) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let def = self.property_on(&registry, node, property)?;

        if def.container {
            let inside = matches!(
                self.node_ref(node)?.slot,
                Some(Slot::Contained { property, .. }) if Some(property) == def.opposite
            );
            if inside {
                self.detach(node)?;
            }
            return Ok(());
        }

        let removed = self.node_mut(node)?.clear_stored(def.id);
        if def.containment {
            let children: Vec<NodeId> = match &removed {
                Some(Stored::Single(v)) => v.as_node().into_iter().collect(),
                Some(Stored::Many(items)) => items.iter().filter_map(Value::as_node).collect(),
                None => Vec::new(),
            };
            for child in children {
                self.node_mut(child)?.slot = None;
            }
        }

        let old = match removed {
            Some(Stored::Single(v)) => v,
            _ => Value::Null,
        };
        self.notify(
            Notification::new(NotificationKind::Unset, Some(node), Some(def.id))
                .with_old(old)
                .with_new(if def.many { Value::Null } else { def.default_value() }),
        );
        Ok(())
    }

    fn set_containment_single(&mut self, node: NodeId, def: &PropertyDef, value: Value) -> GraphResult<()> {
        let current = match self.node_ref(node)?.get_stored(def.id) {
            Some(Stored::Single(Value::Node(child))) => Some(*child),
            _ => None,
        };
        let new_child = value.as_node();
        if current.is_some() && current == new_child {
            return Ok(());
        }

        if let Some(child) = new_child {
            self.detach(child)?;
        }
        if let Some(old) = current {
            self.node_mut(old)?.slot = None;
        }
        match new_child {
            Some(child) => {
                self.node_mut(node)?.set_single(def.id, Value::Node(child));
                self.node_mut(child)?.slot = Some(Slot::Contained {
                    container: node,
                    property: def.id,
                    index: 0,
                });
            }
            None => {
                self.node_mut(node)?.clear_stored(def.id);
            }
        }
        self.notify(
            Notification::new(NotificationKind::Set, Some(node), Some(def.id))
                .with_old(current.map(Value::Node).unwrap_or(Value::Null))
                .with_new(value),
        );
        Ok(())
    }

    fn set_container(
        &mut self,
        registry: &Registry,
        node: NodeId,
        def: &PropertyDef,
        value: Value,
    ) -> GraphResult<()> {
        let opposite_id = def.opposite.ok_or_else(|| {
            GraphError::InvalidOperation(format!("container property {} has no opposite", def.name))
        })?;
        let opposite = registry
            .get_property(opposite_id)
            .ok_or(GraphError::PropertyNotFound(opposite_id))?;
        let slot = self.node_ref(node)?.slot;

        match value {
            Value::Node(parent) => {
                let already = matches!(
                    slot,
                    Some(Slot::Contained { container, property, .. })
                        if container == parent && property == opposite_id
                );
                if already {
                    return Ok(());
                }
                if opposite.many {
                    self.detach(node)?;
                    let index = self.read_list(self.node_ref(parent)?, opposite_id).len();
                    self.attach_in_list(parent, opposite_id, index, node)
                } else {
                    self.set_containment_single(parent, opposite, Value::Node(node))
                }
            }
            _ => {
                if matches!(slot, Some(Slot::Contained { property, .. }) if property == opposite_id) {
                    self.detach(node)?;
                }
                Ok(())
            }
        }
    }

    // ==================== Multi-Valued ====================

    /// Insert a value at `index` (0..=len).
    pub fn insert(&mut self, node: NodeId, property: PropertyId, index: usize, value: Value) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let def = self.property_on(&registry, node, property)?;
        require_many(def)?;
        self.check_value(&registry, def, &value, true)?;
        let items = self.read_list(self.node_ref(node)?, def.id);
        if index > items.len() {
            return Err(out_of_bounds(def, index, items.len()));
        }
        if def.unique && items.contains(&value) {
            return Err(duplicate(def, &value));
        }
        self.guards.check(self, node, def, &value)?;
        self.check_containment(node, def, &value)?;

        match value {
            Value::Node(child) if def.containment => {
                self.detach(child)?;
                self.attach_in_list(node, def.id, index, child)
            }
            value => {
                self.node_mut(node)?.list_mut(def.id).insert(index, value.clone());
                self.notify(
                    Notification::new(NotificationKind::Add, Some(node), Some(def.id))
                        .with_new(value)
                        .at(index),
                );
                Ok(())
            }
        }
    }

    /// Remove and return the value at `index`. A removed contained child
    /// becomes detached.
    pub fn remove(&mut self, node: NodeId, property: PropertyId, index: usize) -> GraphResult<Value> {
        let registry = Arc::clone(&self.registry);
        let def = self.property_on(&registry, node, property)?;
        require_many(def)?;
        let len = self.read_list(self.node_ref(node)?, def.id).len();
        if index >= len {
            return Err(out_of_bounds(def, index, len));
        }

        let old = self.node_mut(node)?.list_mut(def.id).remove(index);
        if def.containment {
            if let Value::Node(child) = old {
                self.node_mut(child)?.slot = None;
            }
            self.renumber_list(node, def.id)?;
        }
        self.notify(
            Notification::new(NotificationKind::Remove, Some(node), Some(def.id))
                .with_old(old.clone())
                .at(index),
        );
        Ok(old)
    }

    /// Move the element at `from` so it ends up at `to`. Returns the moved
    /// value.
    pub fn move_element(&mut self, node: NodeId, property: PropertyId, to: usize, from: usize) -> GraphResult<Value> {
        let registry = Arc::clone(&self.registry);
        let def = self.property_on(&registry, node, property)?;
        require_many(def)?;
        let len = self.read_list(self.node_ref(node)?, def.id).len();
        for index in [to, from] {
            if index >= len {
                return Err(out_of_bounds(def, index, len));
            }
        }

        let list = self.node_mut(node)?.list_mut(def.id);
        let moved = list.remove(from);
        list.insert(to, moved.clone());
        if def.containment {
            self.renumber_list(node, def.id)?;
        }
        self.notify(
            Notification::new(NotificationKind::Move, Some(node), Some(def.id))
                .with_new(moved.clone())
                .at(to)
                .moved_from(from),
        );
        Ok(moved)
    }

    /// Overwrite the element at `index`, returning the previous value.
    pub fn replace(&mut self, node: NodeId, property: PropertyId, index: usize, value: Value) -> GraphResult<Value> {
        let registry = Arc::clone(&self.registry);
        let def = self.property_on(&registry, node, property)?;
        require_many(def)?;
        self.check_value(&registry, def, &value, true)?;
        let items = self.read_list(self.node_ref(node)?, def.id);
        if index >= items.len() {
            return Err(out_of_bounds(def, index, items.len()));
        }
        let old = items[index].clone();
        if old == value {
            return Ok(old);
        }
        if def.unique && items.contains(&value) {
            return Err(duplicate(def, &value));
        }
        self.guards.check(self, node, def, &value)?;
        self.check_containment(node, def, &value)?;

        if def.containment {
            if let Value::Node(child) = value {
                self.detach(child)?;
            }
            if let Value::Node(previous) = old {
                self.node_mut(previous)?.slot = None;
            }
        }
        self.node_mut(node)?.list_mut(def.id)[index] = value.clone();
        if def.containment {
            self.renumber_list(node, def.id)?;
        }
        self.notify(
            Notification::new(NotificationKind::Set, Some(node), Some(def.id))
                .with_old(old.clone())
                .with_new(value)
                .at(index),
        );
        Ok(old)
    }

    // ==================== Placement ====================

    /// Put a node into an exact slot, detaching it from wherever it is.
    /// `None` detaches. Used to restore a previously observed slot.
    pub fn place(&mut self, node: NodeId, slot: Option<Slot>) -> GraphResult<()> {
        if self.slot_of(node)? == slot {
            return Ok(());
        }
        match slot {
            None => self.detach(node),
            Some(Slot::Root(index)) => {
                self.detach(node)?;
                let index = index.min(self.roots.len());
                self.roots.insert(index, node);
                self.renumber_roots();
                self.notify(
                    Notification::new(NotificationKind::Add, None, None)
                        .with_new(Value::Node(node))
                        .at(index),
                );
                Ok(())
            }
            Some(Slot::Contained {
                container,
                property,
                index,
            }) => {
                let registry = Arc::clone(&self.registry);
                let def = self.property_on(&registry, container, property)?;
                if !def.containment {
                    return Err(GraphError::InvalidOperation(format!(
                        "{} is not a containment property",
                        def.name
                    )));
                }
                let value = Value::Node(node);
                self.check_value(&registry, def, &value, def.many)?;
                self.check_containment(container, def, &value)?;

                if def.many {
                    self.detach(node)?;
                    let len = self.read_list(self.node_ref(container)?, def.id).len();
                    if index > len {
                        return Err(out_of_bounds(def, index, len));
                    }
                    self.attach_in_list(container, def.id, index, node)
                } else {
                    self.set_containment_single(container, def, value)
                }
            }
        }
    }

    // ==================== Checks ====================

    fn check_value(&self, registry: &Registry, def: &PropertyDef, value: &Value, in_list: bool) -> GraphResult<()> {
        let mismatch = |expected: String, actual: &str| GraphError::TypeMismatch {
            property: def.name.clone(),
            expected,
            actual: actual.to_string(),
        };

        match (&def.target, value) {
            (_, Value::Null) if in_list => Err(mismatch(describe(registry, &def.target), "Null")),
            (_, Value::Null) if def.is_non_nullable_primitive() => {
                Err(GraphError::NullNotAllowed(def.name.clone()))
            }
            (_, Value::Null) => Ok(()),
            (PropertyTarget::Primitive(kind), v) => {
                if v.fits_primitive(*kind) {
                    Ok(())
                } else {
                    Err(mismatch(kind.to_string(), v.type_name()))
                }
            }
            (PropertyTarget::Enumeration(expected), Value::Literal(actual, index)) if expected == actual => {
                let known = registry
                    .get_enum(*expected)
                    .map(|e| (*index as usize) < e.literals.len())
                    .unwrap_or(false);
                if known {
                    Ok(())
                } else {
                    Err(mismatch(describe(registry, &def.target), "unknown literal"))
                }
            }
            (PropertyTarget::Node(expected), Value::Node(target)) => {
                let actual = self.type_of(*target)?;
                if registry.is_subtype(actual, *expected) {
                    Ok(())
                } else {
                    Err(mismatch(
                        registry.type_name(*expected).to_string(),
                        registry.type_name(actual),
                    ))
                }
            }
            (target, v) => Err(mismatch(describe(registry, target), v.type_name())),
        }
    }

    /// Reject writes that would make a node its own ancestor.
    fn check_containment(&self, node: NodeId, def: &PropertyDef, value: &Value) -> GraphResult<()> {
        let Value::Node(target) = value else {
            return Ok(());
        };
        if def.containment && self.ancestors_and_self(node).contains(target) {
            return Err(GraphError::RecursiveContainment {
                container: node,
                child: *target,
            });
        }
        if def.container && self.ancestors_and_self(*target).contains(&node) {
            return Err(GraphError::RecursiveContainment {
                container: *target,
                child: node,
            });
        }
        Ok(())
    }

    fn attach_in_list(&mut self, container: NodeId, property: PropertyId, index: usize, child: NodeId) -> GraphResult<()> {
        self.node_mut(container)?
            .list_mut(property)
            .insert(index, Value::Node(child));
        self.renumber_list(container, property)?;
        self.notify(
            Notification::new(NotificationKind::Add, Some(container), Some(property))
                .with_new(Value::Node(child))
                .at(index),
        );
        Ok(())
    }
}

fn require_single(def: &PropertyDef) -> GraphResult<()> {
    if def.many {
        return Err(GraphError::ArityMismatch {
            property: def.name.clone(),
            expected: "multi-valued",
        });
    }
    Ok(())
}

fn require_many(def: &PropertyDef) -> GraphResult<()> {
    if !def.many {
        return Err(GraphError::ArityMismatch {
            property: def.name.clone(),
            expected: "single-valued",
        });
    }
    Ok(())
}

fn out_of_bounds(def: &PropertyDef, index: usize, len: usize) -> GraphError {
    GraphError::IndexOutOfBounds {
        property: def.name.clone(),
        index,
        len,
    }
}

fn duplicate(def: &PropertyDef, value: &Value) -> GraphError {
    GraphError::InvalidOperation(format!("{} already holds {}", def.name, value))
}

fn describe(registry: &Registry, target: &PropertyTarget) -> String {
    match target {
        PropertyTarget::Primitive(kind) => kind.to_string(),
        PropertyTarget::Enumeration(id) => registry
            .get_enum(*id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| id.to_string()),
        PropertyTarget::Node(id) => registry.type_name(*id).to_string(),
    }
}
