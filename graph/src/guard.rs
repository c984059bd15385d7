//! Model-level write checks the schema does not expose.
//!
//! A target restriction narrows the node type a property accepts below its
//! declared type. A validator is an arbitrary named rule. Both reject a
//! write before anything changes.

use crate::Graph;
use modelfuzz_core::{GraphError, GraphResult, NodeId, PropertyId, TypeId, Value};
use modelfuzz_registry::PropertyDef;
use std::collections::BTreeMap;
use std::fmt;

/// A named write rule. Returns the rejection reason on failure.
pub type Validator = Box<dyn Fn(&Graph, NodeId, &PropertyDef, &Value) -> Result<(), String>>;

#[derive(Default)]
pub(crate) struct WriteGuards {
    restrictions: BTreeMap<PropertyId, TypeId>,
    validators: Vec<(String, Validator)>,
}

impl fmt::Debug for WriteGuards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuards")
            .field("restrictions", &self.restrictions)
            .field(
                "validators",
                &self.validators.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl WriteGuards {
    pub(crate) fn check(
        &self,
        graph: &Graph,
        node: NodeId,
        def: &PropertyDef,
        value: &Value,
    ) -> GraphResult<()> {
        if let (Some(required), Value::Node(target)) = (self.restrictions.get(&def.id), value) {
            let actual = graph.type_of(*target)?;
            let registry = graph.registry();
            if !registry.is_subtype(actual, *required) {
                return Err(GraphError::HiddenTypeConstraint {
                    property: def.name.clone(),
                    required: registry.type_name(*required).to_string(),
                    actual: registry.type_name(actual).to_string(),
                });
            }
        }

        for (name, rule) in &self.validators {
            if let Err(reason) = rule(graph, node, def, value) {
                return Err(GraphError::ValidationRejected {
                    property: def.name.clone(),
                    rule: name.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

impl Graph {
    /// Only accept nodes of `type_id` (or its subtypes) in `property`, even
    /// though the schema declares a wider type.
    pub fn restrict_target(&mut self, property: PropertyId, type_id: TypeId) {
        self.guards.restrictions.insert(property, type_id);
    }

    /// Register a validation rule run on every set, insert and replace.
    pub fn add_validator<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(&Graph, NodeId, &PropertyDef, &Value) -> Result<(), String> + 'static,
    {
        self.guards.validators.push((name.into(), Box::new(rule)));
    }
}
