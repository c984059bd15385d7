//! Candidate value generation.

use crate::cache::SchemaCache;
use crate::config::ValueStrategy;
use crate::error::{FuzzError, FuzzResult};
use crate::model::Model;
use modelfuzz_core::{NodeId, PrimitiveKind, TypeId, Value};
use modelfuzz_registry::{PropertyDef, PropertyTarget};
use rand::Rng;

/// One candidate for a property, or nothing usable.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Value(Value),
    NoValue,
}

impl Candidate {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Candidate::Value(v) => Some(v),
            Candidate::NoValue => None,
        }
    }
}

/// Produces candidate values drawn from a property's declared domain.
///
/// Instantiating a node-valued candidate creates a detached node in the
/// model.
pub struct ValueGenerator<'a, M: Model, R: Rng> {
    model: &'a mut M,
    cache: &'a mut SchemaCache,
    rng: &'a mut R,
    strategy: ValueStrategy,
}

impl<'a, M: Model, R: Rng> ValueGenerator<'a, M, R> {
    pub fn new(model: &'a mut M, cache: &'a mut SchemaCache, rng: &'a mut R, strategy: ValueStrategy) -> Self {
        Self {
            model,
            cache,
            rng,
            strategy,
        }
    }

    /// Generate one candidate for `property`. `existing` lists the nodes a
    /// node-valued candidate may reuse.
    pub fn generate(&mut self, property: &PropertyDef, existing: &[NodeId]) -> FuzzResult<Candidate> {
        match property.target {
            PropertyTarget::Enumeration(enum_id) => {
                let count = self
                    .cache
                    .registry()
                    .get_enum(enum_id)
                    .map(|e| e.literals.len())
                    .filter(|count| *count > 0)
                    .ok_or_else(|| FuzzError::no_literals(&property.name, enum_id))?;
                let index = self.rng.gen_range(0..count);
                Ok(Candidate::Value(Value::Literal(enum_id, index as u32)))
            }
            PropertyTarget::Primitive(kind) => {
                let value = match kind {
                    PrimitiveKind::Int => Value::Int(self.rng.gen::<i64>()),
                    PrimitiveKind::Text => Value::Text(self.rng.gen::<i32>().to_string()),
                    PrimitiveKind::Real => Value::Real(self.rng.gen::<f64>()),
                    PrimitiveKind::Bool => Value::Bool(self.rng.gen_bool(0.5)),
                    PrimitiveKind::Timestamp | PrimitiveKind::Bytes => {
                        return Err(FuzzError::unsupported_primitive(&property.name, kind));
                    }
                };
                Ok(Candidate::Value(value))
            }
            PropertyTarget::Node(target) => {
                let reuse = match self.strategy {
                    ValueStrategy::Mixed => self.rng.gen_bool(0.5),
                    ValueStrategy::ReuseOnly => true,
                    ValueStrategy::InstantiateOnly => false,
                };
                if reuse {
                    self.reuse(target, existing)
                } else {
                    self.instantiate(target)
                }
            }
        }
    }

    fn reuse(&mut self, target: TypeId, existing: &[NodeId]) -> FuzzResult<Candidate> {
        let registry = self.model.registry();
        let mut matches = Vec::new();
        for &node in existing {
            if registry.is_subtype(self.model.type_of(node)?, target) {
                matches.push(node);
            }
        }
        if matches.is_empty() {
            return Ok(Candidate::NoValue);
        }
        let pick = matches[self.rng.gen_range(0..matches.len())];
        Ok(Candidate::Value(Value::Node(pick)))
    }

    fn instantiate(&mut self, target: TypeId) -> FuzzResult<Candidate> {
        let subtypes = self.cache.subtypes_of(target);
        if subtypes.is_empty() {
            tracing::debug!(
                type_name = self.cache.registry().type_name(target),
                "no concrete type to instantiate"
            );
            return Ok(Candidate::NoValue);
        }
        let chosen = subtypes[self.rng.gen_range(0..subtypes.len())];
        let node = self.model.create_node(chosen)?;
        Ok(Candidate::Value(Value::Node(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelfuzz_core::EnumId;
    use modelfuzz_graph::Graph;
    use modelfuzz_registry::{PropertyDecl, Registry, RegistryBuilder};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn registry() -> Arc<Registry> {
        let mut builder = RegistryBuilder::new();
        builder.add_enum("Level", &["Low", "High"]).unwrap();
        builder.add_type("Base").abstract_type().done().unwrap();
        builder.add_type("Leaf").extends("Base").done().unwrap();
        builder.add_type("Orphan").abstract_type().done().unwrap();
        builder
            .add_type("Holder")
            .property(PropertyDecl::attribute("count", PrimitiveKind::Int))
            .property(PropertyDecl::attribute("label", PrimitiveKind::Text))
            .property(PropertyDecl::attribute("ratio", PrimitiveKind::Real))
            .property(PropertyDecl::attribute("stamp", PrimitiveKind::Timestamp))
            .property(PropertyDecl::enumeration("level", "Level"))
            .property(PropertyDecl::containment("items", "Base").many())
            .property(PropertyDecl::reference("ghost", "Orphan"))
            .done()
            .unwrap();
        Arc::new(builder.build().unwrap())
    }

    struct Setup {
        graph: Graph,
        cache: SchemaCache,
        rng: StdRng,
        holder: NodeId,
    }

    fn setup() -> Setup {
        let registry = registry();
        let mut graph = Graph::new(Arc::clone(&registry));
        let holder = graph.add_root(registry.get_type_id("Holder").unwrap()).unwrap();
        Setup {
            graph,
            cache: SchemaCache::new(registry, BTreeSet::new()),
            rng: StdRng::seed_from_u64(1),
            holder,
        }
    }

    fn prop<'r>(registry: &'r Registry, name: &str) -> &'r PropertyDef {
        let holder = registry.get_type_id("Holder").unwrap();
        registry.get_type_property(holder, name).unwrap()
    }

    // ========== TEST: primitive_domains ==========
    #[test]
    fn test_primitive_domains() {
        let mut s = setup();
        let registry = s.graph.registry_handle();
        let existing = vec![s.holder];
        let mut generator = ValueGenerator::new(&mut s.graph, &mut s.cache, &mut s.rng, ValueStrategy::Mixed);

        for _ in 0..20 {
            let text = generator.generate(prop(&registry, "label"), &existing).unwrap();
            let Candidate::Value(Value::Text(t)) = &text else {
                panic!("expected text, got {:?}", text);
            };
            assert!(t.parse::<i32>().is_ok());

            let real = generator.generate(prop(&registry, "ratio"), &existing).unwrap();
            let Candidate::Value(Value::Real(r)) = &real else {
                panic!("expected real, got {:?}", real);
            };
            assert!((0.0..1.0).contains(r));

            let level = generator.generate(prop(&registry, "level"), &existing).unwrap();
            assert!(matches!(level, Candidate::Value(Value::Literal(_, i)) if i < 2));
        }
    }

    // ========== TEST: unsupported_primitive ==========
    #[test]
    fn test_unsupported_primitive() {
        let mut s = setup();
        let registry = s.graph.registry_handle();
        let mut generator = ValueGenerator::new(&mut s.graph, &mut s.cache, &mut s.rng, ValueStrategy::Mixed);

        let result = generator.generate(prop(&registry, "stamp"), &[]);

        assert!(matches!(result, Err(FuzzError::UnsupportedPrimitive { .. })));
    }

    // ========== TEST: instantiate_concrete_subtype ==========
    #[test]
    fn test_instantiate_concrete_subtype() {
        // GIVEN items targets abstract Base with one concrete subtype Leaf
        let mut s = setup();
        let registry = s.graph.registry_handle();
        let before = s.graph.node_count();
        let mut generator =
            ValueGenerator::new(&mut s.graph, &mut s.cache, &mut s.rng, ValueStrategy::InstantiateOnly);

        // WHEN
        let candidate = generator.generate(prop(&registry, "items"), &[]).unwrap();

        // THEN a detached Leaf was created
        let Candidate::Value(Value::Node(node)) = &candidate else {
            panic!("expected a node, got {:?}", candidate);
        };
        assert_eq!(s.graph.type_of(*node).unwrap(), registry.get_type_id("Leaf").unwrap());
        assert_eq!(s.graph.node_count(), before + 1);
        assert_eq!(s.graph.slot_of(*node).unwrap(), None);
    }

    // ========== TEST: no_value_paths ==========
    #[test]
    fn test_no_value_paths() {
        // GIVEN no Base node exists and Orphan has no concrete subtype
        let mut s = setup();
        let registry = s.graph.registry_handle();
        let existing = vec![s.holder];

        // WHEN reuse finds nothing, or instantiation has nothing to create
        let reuse = ValueGenerator::new(&mut s.graph, &mut s.cache, &mut s.rng, ValueStrategy::ReuseOnly)
            .generate(prop(&registry, "items"), &existing)
            .unwrap();
        let ghost = ValueGenerator::new(&mut s.graph, &mut s.cache, &mut s.rng, ValueStrategy::InstantiateOnly)
            .generate(prop(&registry, "ghost"), &existing)
            .unwrap();

        // THEN
        assert_eq!(reuse, Candidate::NoValue);
        assert_eq!(ghost, Candidate::NoValue);
    }

    // ========== TEST: enum_without_literals ==========
    #[test]
    fn test_enum_without_literals() {
        // GIVEN a property pointing at an enumeration the registry lacks
        let mut s = setup();
        let registry = s.graph.registry_handle();
        let mut dangling = prop(&registry, "level").clone();
        dangling.target = PropertyTarget::Enumeration(EnumId::new(9));
        let mut generator = ValueGenerator::new(&mut s.graph, &mut s.cache, &mut s.rng, ValueStrategy::Mixed);

        // WHEN
        let result = generator.generate(&dangling, &[]);

        // THEN the generator refuses instead of reporting no value
        assert!(matches!(result, Err(FuzzError::NoLiterals { property, .. }) if property == "level"));
    }
}
