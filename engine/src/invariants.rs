//! Structural checks over a whole model.
//!
//! The engine promises that no sequence of its edits leaves a containment
//! cycle or a duplicated unique value behind. These checks let a harness
//! verify that after every step.

use crate::model::Model;
use modelfuzz_core::{NodeId, Value};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum InvariantViolation {
    #[error("Containment cycle through {node}")]
    ContainmentCycle { node: NodeId },

    #[error("{node}.{property} holds {value} more than once")]
    DuplicateValue {
        node: NodeId,
        property: String,
        value: String,
    },

    #[error("{child} is listed under {container}.{property} but its container is {actual:?}")]
    ContainerMismatch {
        container: NodeId,
        property: String,
        child: NodeId,
        actual: Option<NodeId>,
    },
}

/// Every reachable node has a finite container chain.
pub fn check_acyclic<M: Model + ?Sized>(model: &M) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    for node in model.all_contents() {
        let mut seen = BTreeSet::from([node]);
        let mut current = node;
        while let Some(parent) = model.container_of(current) {
            if !seen.insert(parent) {
                violations.push(InvariantViolation::ContainmentCycle { node });
                break;
            }
            current = parent;
        }
    }
    violations
}

/// No unique list of a reachable node holds the same value twice.
pub fn check_unique<M: Model + ?Sized>(model: &M) -> Vec<InvariantViolation> {
    let registry = model.registry();
    let mut violations = Vec::new();
    for node in model.all_contents() {
        let Ok(type_id) = model.type_of(node) else {
            continue;
        };
        for def in registry.get_all_type_properties(type_id) {
            if !def.is_unique_collection() {
                continue;
            }
            let Ok(values) = model.list(node, def.id) else {
                continue;
            };
            if let Some(value) = first_duplicate(&values) {
                violations.push(InvariantViolation::DuplicateValue {
                    node,
                    property: def.name.clone(),
                    value: value.to_string(),
                });
            }
        }
    }
    violations
}

/// Every node held by a containment property reports that holder as its
/// container.
pub fn check_containers<M: Model + ?Sized>(model: &M) -> Vec<InvariantViolation> {
    let registry = model.registry();
    let mut violations = Vec::new();
    for node in model.all_contents() {
        let Ok(type_id) = model.type_of(node) else {
            continue;
        };
        for def in registry.containment_properties(type_id) {
            let children = if def.many {
                model.list(node, def.id).unwrap_or_default()
            } else {
                model.get(node, def.id).map(|v| vec![v]).unwrap_or_default()
            };
            for child in children.iter().filter_map(Value::as_node) {
                let actual = model.container_of(child);
                if actual != Some(node) {
                    violations.push(InvariantViolation::ContainerMismatch {
                        container: node,
                        property: def.name.clone(),
                        child,
                        actual,
                    });
                }
            }
        }
    }
    violations
}

pub fn check_all<M: Model + ?Sized>(model: &M) -> Vec<InvariantViolation> {
    let mut violations = check_acyclic(model);
    violations.extend(check_unique(model));
    violations.extend(check_containers(model));
    violations
}

fn first_duplicate(values: &[Value]) -> Option<&Value> {
    values
        .iter()
        .enumerate()
        .find(|(i, v)| values[..*i].contains(v))
        .map(|(_, v)| v)
}
