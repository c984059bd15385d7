//! Memoized schema queries.

use modelfuzz_core::{PropertyId, TypeId};
use modelfuzz_registry::Registry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Per-type answers the engine asks for on every change: the concrete
/// subtypes a node-valued property can instantiate, and the properties a
/// node of the type may have mutated.
///
/// Entries are computed on first use and never invalidated; the schema is
/// immutable.
#[derive(Debug)]
pub struct SchemaCache {
    registry: Arc<Registry>,
    excluded: BTreeSet<String>,
    subtypes: BTreeMap<TypeId, Vec<TypeId>>,
    properties: BTreeMap<TypeId, Vec<PropertyId>>,
}

impl SchemaCache {
    pub fn new(registry: Arc<Registry>, excluded: BTreeSet<String>) -> Self {
        Self {
            registry,
            excluded,
            subtypes: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Concrete types conforming to `type_id`, in type-id order, with
    /// `type_id` itself last when it is concrete.
    pub fn subtypes_of(&mut self, type_id: TypeId) -> &[TypeId] {
        let registry = &self.registry;
        self.subtypes.entry(type_id).or_insert_with(|| {
            let mut result: Vec<TypeId> = registry
                .all_types()
                .filter(|t| t.id != type_id && !t.is_abstract && registry.is_subtype(t.id, type_id))
                .map(|t| t.id)
                .collect();
            if registry.get_type(type_id).map(|t| !t.is_abstract).unwrap_or(false) {
                result.push(type_id);
            }
            tracing::debug!(
                type_name = registry.type_name(type_id),
                count = result.len(),
                "cached concrete subtypes"
            );
            result
        })
    }

    /// Properties of `type_id` (inherited first) that are changeable, not
    /// derived and not excluded by name. Empty results are cached too.
    pub fn mutable_properties_of(&mut self, type_id: TypeId) -> &[PropertyId] {
        let registry = &self.registry;
        let excluded = &self.excluded;
        self.properties.entry(type_id).or_insert_with(|| {
            let result: Vec<PropertyId> = registry
                .get_all_type_properties(type_id)
                .into_iter()
                .filter(|p| p.changeable && !p.derived && !excluded.contains(&p.name))
                .map(|p| p.id)
                .collect();
            tracing::debug!(
                type_name = registry.type_name(type_id),
                count = result.len(),
                "cached mutable properties"
            );
            result
        })
    }

    /// Number of types with cached mutable properties.
    pub fn cached_property_entries(&self) -> usize {
        self.properties.len()
    }
}
