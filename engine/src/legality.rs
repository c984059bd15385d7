//! Structural legality checks run before every node-valued write.

use crate::model::Model;
use modelfuzz_core::{NodeId, Value};
use modelfuzz_registry::PropertyDef;
use std::collections::BTreeSet;

/// The node followed by its containers up to the top. Stops if the parent
/// chain ever revisits a node.
pub fn ancestors_and_self<M: Model + ?Sized>(model: &M, node: NodeId) -> Vec<NodeId> {
    let mut chain = vec![node];
    let mut seen = BTreeSet::from([node]);
    let mut current = node;
    while let Some(parent) = model.container_of(current) {
        if !seen.insert(parent) {
            tracing::warn!(node = %node, "containment chain revisits {}", parent);
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Whether writing `candidate` into `property` of `node` would close a
/// containment cycle. Non-node candidates never do.
pub fn would_violate_invariant<M: Model + ?Sized>(
    model: &M,
    node: NodeId,
    property: &PropertyDef,
    candidate: &Value,
) -> bool {
    let Value::Node(target) = candidate else {
        return false;
    };
    if property.containment && ancestors_and_self(model, node).contains(target) {
        return true;
    }
    if property.container {
        // moving under oneself or under one's own descendant
        return *target == node || ancestors_and_self(model, *target).contains(&node);
    }
    false
}

/// Whether adding `candidate` to a unique list already holding `current`
/// would duplicate a value.
pub fn violates_uniqueness(current: &[Value], property: &PropertyDef, candidate: &Value) -> bool {
    property.unique && current.contains(candidate)
}
