//! Observable model state, for comparing a model before and after changes.

use crate::Graph;
use modelfuzz_core::{Node, NodeId, PropertyId, Slot, Stored, TypeId};

/// The observable state of one node: its slot and every property as read
/// through the accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub id: NodeId,
    pub type_id: TypeId,
    pub slot: Option<Slot>,
    pub values: Vec<(PropertyId, Stored)>,
}

/// State of every node (detached ones included) and the root list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub roots: Vec<NodeId>,
    pub nodes: Vec<NodeState>,
}

impl Snapshot {
    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl Graph {
    /// Capture the observable state of the whole model.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            roots: self.roots.clone(),
            nodes: self.nodes.values().map(|node| self.node_state(node)).collect(),
        }
    }

    /// Like `snapshot`, restricted to nodes reachable from the roots.
    /// Detached nodes left over from instantiation do not show up.
    pub fn reachable_snapshot(&self) -> Snapshot {
        let mut reachable: Vec<&Node> = self
            .all_contents()
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .collect();
        reachable.sort_by_key(|node| node.id);
        Snapshot {
            roots: self.roots.clone(),
            nodes: reachable.into_iter().map(|node| self.node_state(node)).collect(),
        }
    }

    fn node_state(&self, node: &Node) -> NodeState {
        let values = self
            .registry
            .get_all_type_properties(node.type_id)
            .into_iter()
            .map(|def| {
                let stored = if def.many {
                    Stored::Many(self.read_list(node, def.id).to_vec())
                } else {
                    Stored::Single(self.read_single(node, def))
                };
                (def.id, stored)
            })
            .collect();
        NodeState {
            id: node.id,
            type_id: node.type_id,
            slot: node.slot,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{folder_registry, prop, type_id};
    use modelfuzz_core::Value;
    use pretty_assertions::assert_eq;

    // ========== TEST: snapshot_detects_change ==========
    #[test]
    fn test_snapshot_detects_change() {
        // GIVEN a snapshot of a one-file model
        let mut graph = Graph::new(folder_registry());
        let file = graph.add_root(type_id(&graph, "File")).unwrap();
        let size = prop(&graph, "Item", "size");
        let before = graph.snapshot();

        // WHEN size changes and changes back
        graph.set(file, size, Value::Int(5)).unwrap();
        let during = graph.snapshot();
        graph.set(file, size, Value::Int(0)).unwrap();

        // THEN only the intermediate snapshot differs
        assert_ne!(before, during);
        assert_eq!(before, graph.snapshot());
        assert_eq!(
            during.node(file).unwrap().slot,
            Some(Slot::Root(0))
        );
    }

    // ========== TEST: reachable_snapshot_ignores_detached ==========
    #[test]
    fn test_reachable_snapshot_ignores_detached() {
        let mut graph = Graph::new(folder_registry());
        graph.add_root(type_id(&graph, "Folder")).unwrap();
        let before = graph.reachable_snapshot();

        graph.create_node(type_id(&graph, "File")).unwrap();

        assert_eq!(before, graph.reachable_snapshot());
        assert_ne!(graph.snapshot().nodes.len(), before.nodes.len());
    }
}
