//! The mutation engine.

use crate::cache::SchemaCache;
use crate::config::FuzzConfig;
use crate::error::{FuzzError, FuzzResult};
use crate::generator::ValueGenerator;
use crate::kinds::{ChangeKind, ManyChangeKind, SingleChangeKind};
use crate::legality::{violates_uniqueness, would_violate_invariant};
use crate::model::Model;
use crate::report::{ChangeOutcome, ChangeReport, Conversion, Rejection, RunSummary};
use crate::trace::{DiagnosticsSink, Narrator, TracingSink};
use crate::undo::{settle, ChangeRequest, Inverse, PendingUndo, Reversal, UndoOutcome};
use modelfuzz_core::{GraphError, NodeId, PropertyId, Value};
use modelfuzz_registry::{PropertyDef, Registry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Randomly mutates a model, one legal edit per call.
///
/// The fuzzer owns the model, its random source and its schema caches for
/// its whole lifetime. Given the same seed, the same start model and the
/// same sequence of calls, every decision is reproduced.
pub struct ModelFuzzer<M: Model, R: Rng = StdRng> {
    model: M,
    rng: R,
    registry: Arc<Registry>,
    cache: SchemaCache,
    config: FuzzConfig,
    narrator: Narrator,
}

impl<M: Model> ModelFuzzer<M, StdRng> {
    /// Create a fuzzer seeded from `config.seed`.
    pub fn new(model: M, config: FuzzConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(model, config, rng)
    }
}

impl<M: Model, R: Rng> ModelFuzzer<M, R> {
    /// Create a fuzzer drawing from a caller-supplied random source.
    pub fn with_rng(model: M, config: FuzzConfig, rng: R) -> Self {
        let registry = model.registry();
        let cache = SchemaCache::new(Arc::clone(&registry), config.excluded_properties.clone());
        let narrator = Narrator::new(config.narrate, Box::new(TracingSink));
        Self {
            model,
            rng,
            registry,
            cache,
            config,
            narrator,
        }
    }

    /// Send narration to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.narrator.replace_sink(Box::new(sink));
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.cache
    }

    // ==================== Entry Points ====================

    /// Pick a node and one of its mutable properties at random, then apply
    /// a random edit kind to it.
    pub fn perform_one_change(&mut self, request: ChangeRequest) -> FuzzResult<ChangeReport> {
        let contents = self.model.all_contents();
        let mut eligible = Vec::with_capacity(contents.len());
        for &node in &contents {
            let type_id = self.model.type_of(node)?;
            if !self.cache.mutable_properties_of(type_id).is_empty() {
                eligible.push(node);
            }
        }
        if eligible.is_empty() {
            return Err(FuzzError::EmptyModel);
        }

        let node = eligible[self.rng.gen_range(0..eligible.len())];
        let type_id = self.model.type_of(node)?;
        let properties = self.cache.mutable_properties_of(type_id);
        let property = properties[self.rng.gen_range(0..properties.len())];

        let registry = Arc::clone(&self.registry);
        let def = registry
            .get_property(property)
            .ok_or(GraphError::PropertyNotFound(property))?;
        let kind = if def.many {
            ChangeKind::Many(ManyChangeKind::SUPPORTED[self.rng.gen_range(0..ManyChangeKind::SUPPORTED.len())])
        } else {
            ChangeKind::Single(SingleChangeKind::ALL[self.rng.gen_range(0..SingleChangeKind::ALL.len())])
        };

        self.execute(node, def, kind, request, &contents)
    }

    /// Apply an edit kind to an explicit target. Randomness is still used for
    /// positions and candidate values.
    pub fn apply_change(
        &mut self,
        node: NodeId,
        property: PropertyId,
        kind: impl Into<ChangeKind>,
        request: ChangeRequest,
    ) -> FuzzResult<ChangeReport> {
        let kind = kind.into();
        let registry = Arc::clone(&self.registry);
        let def = registry
            .get_property(property)
            .ok_or(GraphError::PropertyNotFound(property))?;
        let type_id = self.model.type_of(node)?;
        if !registry.type_has_property(type_id, property) {
            return Err(GraphError::PropertyNotOnNode { node, property }.into());
        }
        if kind.is_many() != def.many {
            return Err(FuzzError::kind_mismatch(&def.name, kind, def.many));
        }

        let contents = self.model.all_contents();
        self.execute(node, def, kind, request, &contents)
    }

    /// Perform `steps` random changes without undo.
    pub fn run(&mut self, steps: usize) -> FuzzResult<RunSummary> {
        self.run_with(steps, |_| ChangeRequest::Apply)
    }

    /// Perform `steps` random changes, asking `schedule` for the request of
    /// each step. Nodes left unreachable by a step are dropped before the
    /// next one.
    pub fn run_with<F>(&mut self, steps: usize, mut schedule: F) -> FuzzResult<RunSummary>
    where
        F: FnMut(usize) -> ChangeRequest,
    {
        let mut summary = RunSummary::default();
        for step in 0..steps {
            let report = self.perform_one_change(schedule(step))?;
            summary.record(&report);
            self.model.collect_garbage();
        }
        tracing::debug!(steps, applied = summary.applied, rejected = summary.rejected, "run finished");
        Ok(summary)
    }

    // ==================== Dispatch ====================

    fn execute(
        &mut self,
        node: NodeId,
        def: &PropertyDef,
        kind: ChangeKind,
        request: ChangeRequest,
        contents: &[NodeId],
    ) -> FuzzResult<ChangeReport> {
        let mut pending = PendingUndo::arm(request, &def.name);
        let mut report = ChangeReport {
            node,
            property: def.id,
            property_name: def.name.clone(),
            kind,
            candidate: None,
            index: None,
            outcome: ChangeOutcome::Applied,
            undo: UndoOutcome::NotRequested,
        };

        let result = match kind {
            ChangeKind::Many(k) => self.change_many(node, def, k, contents, &mut pending, &mut report),
            ChangeKind::Single(k) => self.change_single(node, def, k, contents, &mut pending, &mut report),
        };

        match result {
            Ok(()) => {}
            Err(FuzzError::Graph(err)) => match Rejection::from_graph(&err) {
                Some(rejection) => {
                    self.narrator.say(|| format!("    FAILED because of {}", rejection));
                    tracing::debug!(property = %def.name, reason = rejection.label(), "model refused change");
                    report.outcome = ChangeOutcome::Rejected(rejection);
                    report.undo = settle(&mut pending, UndoOutcome::NothingToRevert);
                }
                None => return Err(err.into()),
            },
            Err(err) => return Err(err),
        }

        if let Some(token) = pending {
            return Err(FuzzError::undo_not_honored(token.property()));
        }
        Ok(report)
    }

    // ==================== Multi-Valued ====================

    fn change_many(
        &mut self,
        node: NodeId,
        def: &PropertyDef,
        kind: ManyChangeKind,
        contents: &[NodeId],
        pending: &mut Option<PendingUndo>,
        report: &mut ChangeReport,
    ) -> FuzzResult<()> {
        let current = self.model.list(node, def.id)?;
        let n = current.len();
        self.narrate_target(node, def, kind.into(), &render_list(&current));

        match kind {
            ManyChangeKind::Add => {
                let Some(value) = self.candidate(def, contents, report)? else {
                    return self.reject(Rejection::NoCandidate, pending, report);
                };
                if violates_uniqueness(&current, def, &value) {
                    return self.reject(Rejection::AlreadyPresent, pending, report);
                }
                if would_violate_invariant(&self.model, node, def, &value) {
                    return self.reject(Rejection::ContainmentCycle, pending, report);
                }

                let index = self.rng.gen_range(0..=n);
                let mut inverse = Inverse::new(node, def.id, Reversal::Remove { index });
                if let Value::Node(target) = value {
                    inverse.capture_slot(&self.model, target)?;
                }
                self.model.insert(node, def.id, index, value)?;
                report.index = Some(index);
                report.undo = self.finish(pending, inverse)?;
            }
            ManyChangeKind::Remove => {
                // an empty list is already clear
                if n == 0 {
                    self.narrator.say(|| "    CONVERTED to clear (empty collection)".to_string());
                    report.outcome = ChangeOutcome::Converted(Conversion::ClearOfEmpty);
                    report.undo = settle(pending, UndoOutcome::NothingToRevert);
                    return Ok(());
                }

                let index = self.rng.gen_range(0..n);
                let old = self.model.remove(node, def.id, index)?;
                report.index = Some(index);
                let inverse = Inverse::new(node, def.id, Reversal::Insert { index, value: old });
                report.undo = self.finish(pending, inverse)?;
            }
            ManyChangeKind::Move => {
                if n == 0 {
                    return self.reject(Rejection::EmptyCollection, pending, report);
                }

                let to = self.rng.gen_range(0..n);
                let from = self.rng.gen_range(0..n);
                self.model.move_element(node, def.id, to, from)?;
                report.index = Some(to);
                let inverse = Inverse::new(node, def.id, Reversal::Move { to: from, from: to });
                report.undo = self.finish(pending, inverse)?;
            }
            ManyChangeKind::Set => {
                let Some(value) = self.candidate(def, contents, report)? else {
                    return self.reject(Rejection::NoCandidate, pending, report);
                };
                if violates_uniqueness(&current, def, &value) {
                    return self.reject(Rejection::AlreadyPresent, pending, report);
                }
                if would_violate_invariant(&self.model, node, def, &value) {
                    return self.reject(Rejection::ContainmentCycle, pending, report);
                }
                if n == 0 {
                    return self.reject(Rejection::EmptyCollection, pending, report);
                }

                let index = self.rng.gen_range(0..n);
                let mut inverse = Inverse::new(
                    node,
                    def.id,
                    Reversal::Replace {
                        index,
                        value: current[index].clone(),
                    },
                );
                if let Value::Node(target) = value {
                    inverse.capture_slot(&self.model, target)?;
                }
                self.model.replace(node, def.id, index, value)?;
                report.index = Some(index);
                report.undo = self.finish(pending, inverse)?;
            }
            ManyChangeKind::AddMany | ManyChangeKind::RemoveMany => {
                let kind = ChangeKind::Many(kind);
                if settle(pending, UndoOutcome::Unsupported) == UndoOutcome::Unsupported {
                    self.narrator.say(|| format!("    Undo {} not supported yet", kind));
                    tracing::warn!(property = %def.name, kind = %kind, "undo requested for batch change");
                }
                return Err(FuzzError::unsupported_change(&def.name, kind));
            }
        }
        Ok(())
    }

    // ==================== Single-Valued ====================

    fn change_single(
        &mut self,
        node: NodeId,
        def: &PropertyDef,
        kind: SingleChangeKind,
        contents: &[NodeId],
        pending: &mut Option<PendingUndo>,
        report: &mut ChangeReport,
    ) -> FuzzResult<()> {
        let old = self.model.get(node, def.id)?;
        self.narrate_target(node, def, kind.into(), &old.to_string());

        // writing a container property relocates the node itself
        let mut inverse = Inverse::new(node, def.id, Reversal::Set { value: old });
        if def.container {
            inverse.capture_slot(&self.model, node)?;
        }

        match kind {
            SingleChangeKind::Set => {
                let Some(value) = self.candidate(def, contents, report)? else {
                    return self.reject(Rejection::NoCandidate, pending, report);
                };
                if would_violate_invariant(&self.model, node, def, &value) {
                    return self.reject(Rejection::ContainmentCycle, pending, report);
                }
                if let Value::Node(target) = value {
                    inverse.capture_slot(&self.model, target)?;
                    if let Some(occupant) = self.displaced_occupant(def, target)? {
                        if occupant != node {
                            inverse.capture_slot(&self.model, occupant)?;
                        }
                    }
                }

                if self.config.forces_unset_before_set(&def.name) {
                    self.model.unset(node, def.id)?;
                    if let Err(err) = self.model.set(node, def.id, value) {
                        if err.is_expected_rejection() {
                            inverse.apply(&mut self.model).map_err(|restore| {
                                GraphError::InvalidOperation(format!(
                                    "rollback of {} failed: {}",
                                    def.name, restore
                                ))
                            })?;
                        }
                        return Err(err.into());
                    }
                } else {
                    self.model.set(node, def.id, value)?;
                }
            }
            SingleChangeKind::SetToAbsent => {
                if def.is_non_nullable_primitive() {
                    self.model.unset(node, def.id)?;
                    self.narrator.say(|| "    CONVERTED to UNSET (primitive type)".to_string());
                    report.outcome = ChangeOutcome::Converted(Conversion::UnsetOfPrimitive);
                } else {
                    self.model.set(node, def.id, Value::Null)?;
                }
            }
            SingleChangeKind::Unset => {
                self.model.unset(node, def.id)?;
            }
        }

        report.undo = self.finish(pending, inverse)?;
        Ok(())
    }

    /// For a container property whose mirrored containment is single-valued,
    /// the node the write would push out of `parent`.
    fn displaced_occupant(&self, def: &PropertyDef, parent: NodeId) -> FuzzResult<Option<NodeId>> {
        if !def.container {
            return Ok(None);
        }
        let Some(opposite) = def.opposite.and_then(|id| self.registry.get_property(id)) else {
            return Ok(None);
        };
        if opposite.many {
            return Ok(None);
        }
        Ok(self.model.get(parent, opposite.id)?.as_node())
    }

    // ==================== Helpers ====================

    fn candidate(
        &mut self,
        def: &PropertyDef,
        contents: &[NodeId],
        report: &mut ChangeReport,
    ) -> FuzzResult<Option<Value>> {
        let candidate = ValueGenerator::new(
            &mut self.model,
            &mut self.cache,
            &mut self.rng,
            self.config.value_strategy,
        )
        .generate(def, contents)?;

        let value = candidate.value().cloned();
        self.narrator.say(|| match &value {
            Some(v) => format!("    newValue = {}", v),
            None => "    newValue = none".to_string(),
        });
        report.candidate = value.clone();
        Ok(value)
    }

    fn reject(
        &mut self,
        rejection: Rejection,
        pending: &mut Option<PendingUndo>,
        report: &mut ChangeReport,
    ) -> FuzzResult<()> {
        self.narrator.say(|| format!("    INVALID (because {})", rejection));
        tracing::debug!(property = %report.property_name, reason = rejection.label(), "change rejected");
        report.outcome = ChangeOutcome::Rejected(rejection);
        report.undo = settle(pending, UndoOutcome::NothingToRevert);
        Ok(())
    }

    /// Reverse an applied edit if undo was requested.
    fn finish(&mut self, pending: &mut Option<PendingUndo>, inverse: Inverse) -> FuzzResult<UndoOutcome> {
        let Some(token) = pending.take() else {
            return Ok(UndoOutcome::NotRequested);
        };
        inverse.apply(&mut self.model).map_err(|err| {
            GraphError::InvalidOperation(format!("undo of {} failed: {}", token.property(), err))
        })?;
        self.narrator.say(|| "    undone".to_string());
        Ok(UndoOutcome::Reverted)
    }

    fn narrate_target(&mut self, node: NodeId, def: &PropertyDef, kind: ChangeKind, old: &str) {
        let registry = &self.registry;
        let model = &self.model;
        self.narrator.say(|| {
            let type_name = model
                .type_of(node)
                .map(|t| registry.type_name(t).to_string())
                .unwrap_or_default();
            format!("{}:{}.{}: {} (oldValue: {})", node, type_name, def.name, kind, old)
        });
    }
}

fn render_list(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueStrategy;
    use crate::trace::MemorySink;
    use modelfuzz_core::{PrimitiveKind, Slot};
    use modelfuzz_graph::Graph;
    use modelfuzz_registry::{PropertyDecl, RegistryBuilder};
    use pretty_assertions::assert_eq;

    /// Folder/Doc schema: folders own documents and sub folders, documents
    /// point back at their folder.
    fn registry() -> Arc<Registry> {
        let mut builder = RegistryBuilder::new();
        builder
            .add_type("Folder")
            .property(PropertyDecl::containment("items", "Entry").many())
            .property(PropertyDecl::containment("cover", "Doc"))
            .property(PropertyDecl::attribute("base_label", PrimitiveKind::Text).nullable())
            .done()
            .unwrap();
        builder.add_type("Entry").abstract_type().done().unwrap();
        builder
            .add_type("Doc")
            .extends("Entry")
            .property(PropertyDecl::attribute("pages", PrimitiveKind::Int))
            .property(PropertyDecl::container("folder", "Folder", "items"))
            .property(PropertyDecl::reference("refs", "Doc").many().unique())
            .done()
            .unwrap();
        builder.add_type("Sub").extends("Entry").extends("Folder").done().unwrap();
        Arc::new(builder.build().unwrap())
    }

    struct Fixture {
        graph: Graph,
        root: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut graph = Graph::new(registry());
            let folder = graph.registry().get_type_id("Folder").unwrap();
            let root = graph.add_root(folder).unwrap();
            Self { graph, root }
        }

        fn prop(&self, type_name: &str, name: &str) -> PropertyId {
            let registry = self.graph.registry();
            let t = registry.get_type_id(type_name).unwrap();
            registry.get_type_property(t, name).unwrap().id
        }

        fn doc_in_root(&mut self) -> NodeId {
            let doc_t = self.graph.registry().get_type_id("Doc").unwrap();
            let items = self.prop("Folder", "items");
            let doc = self.graph.create_node(doc_t).unwrap();
            let len = self.graph.len(self.root, items).unwrap();
            self.graph.insert(self.root, items, len, Value::Node(doc)).unwrap();
            doc
        }

        fn fuzzer(self, config: FuzzConfig) -> ModelFuzzer<Graph> {
            ModelFuzzer::new(self.graph, config)
        }
    }

    // ========== TEST: add_then_undo ==========
    #[test]
    fn test_add_then_undo() {
        // GIVEN an empty items list and instantiation only
        let fx = Fixture::new();
        let (root, items) = (fx.root, fx.prop("Folder", "items"));
        let mut fuzzer = fx.fuzzer(FuzzConfig::new().with_value_strategy(ValueStrategy::InstantiateOnly));

        // WHEN adding with and without undo
        let undone = fuzzer
            .apply_change(root, items, ManyChangeKind::Add, ChangeRequest::ApplyAndUndo)
            .unwrap();
        let len_after_undo = fuzzer.model().len(root, items).unwrap();
        let kept = fuzzer.apply_change(root, items, ManyChangeKind::Add, ChangeRequest::Apply).unwrap();

        // THEN
        assert_eq!(undone.undo, UndoOutcome::Reverted);
        assert_eq!(len_after_undo, 0);
        assert_eq!(kept.outcome, ChangeOutcome::Applied);
        assert_eq!(kept.undo, UndoOutcome::NotRequested);
        assert_eq!(fuzzer.model().len(root, items).unwrap(), 1);
    }

    // ========== TEST: remove_on_empty_converts_to_clear ==========
    #[test]
    fn test_remove_on_empty_converts_to_clear() {
        // GIVEN an empty list and notifications recorded
        let mut fx = Fixture::new();
        let (root, items) = (fx.root, fx.prop("Folder", "items"));
        fx.graph.set_recording(true);
        let mut fuzzer = fx.fuzzer(FuzzConfig::new());

        // WHEN
        let report = fuzzer
            .apply_change(root, items, ManyChangeKind::Remove, ChangeRequest::ApplyAndUndo)
            .unwrap();

        // THEN converted, and the model saw no write at all
        assert_eq!(report.outcome, ChangeOutcome::Converted(Conversion::ClearOfEmpty));
        assert_eq!(report.undo, UndoOutcome::NothingToRevert);
        assert!(fuzzer.model_mut().take_notifications().is_empty());
    }

    // ========== TEST: move_on_empty_rejected ==========
    #[test]
    fn test_move_on_empty_rejected() {
        let fx = Fixture::new();
        let (root, items) = (fx.root, fx.prop("Folder", "items"));
        let sink = MemorySink::new();
        let mut fuzzer = fx.fuzzer(FuzzConfig::new().with_narration(true)).with_sink(sink.clone());

        let report = fuzzer.apply_change(root, items, ManyChangeKind::Move, ChangeRequest::Apply).unwrap();

        assert_eq!(report.outcome, ChangeOutcome::Rejected(Rejection::EmptyCollection));
        assert!(sink.contains("INVALID (because empty collection)"));
    }

    // ========== TEST: remove_and_move_undo ==========
    #[test]
    fn test_remove_and_move_undo() {
        // GIVEN three documents in the root
        let mut fx = Fixture::new();
        for _ in 0..3 {
            fx.doc_in_root();
        }
        let (root, items) = (fx.root, fx.prop("Folder", "items"));
        let before = fx.graph.snapshot();
        let mut fuzzer = fx.fuzzer(FuzzConfig::new().with_seed(3));

        // WHEN removing and moving with undo, several times
        for _ in 0..5 {
            let removed = fuzzer
                .apply_change(root, items, ManyChangeKind::Remove, ChangeRequest::ApplyAndUndo)
                .unwrap();
            let moved = fuzzer
                .apply_change(root, items, ManyChangeKind::Move, ChangeRequest::ApplyAndUndo)
                .unwrap();
            assert_eq!(removed.undo, UndoOutcome::Reverted);
            assert_eq!(moved.undo, UndoOutcome::Reverted);
        }

        // THEN nothing changed
        assert_eq!(before, fuzzer.model().snapshot());
    }

    // ========== TEST: batch_kinds_unsupported ==========
    #[test]
    fn test_batch_kinds_unsupported() {
        let fx = Fixture::new();
        let (root, items) = (fx.root, fx.prop("Folder", "items"));
        let before = fx.graph.snapshot();
        let mut fuzzer = fx.fuzzer(FuzzConfig::new());

        let result = fuzzer.apply_change(root, items, ManyChangeKind::AddMany, ChangeRequest::ApplyAndUndo);

        assert!(matches!(result, Err(FuzzError::UnsupportedChange { .. })));
        assert_eq!(before, fuzzer.model().snapshot());
    }

    // ========== TEST: kind_mismatch ==========
    #[test]
    fn test_kind_mismatch() {
        let fx = Fixture::new();
        let (root, items) = (fx.root, fx.prop("Folder", "items"));
        let mut fuzzer = fx.fuzzer(FuzzConfig::new());

        let result = fuzzer.apply_change(root, items, SingleChangeKind::Unset, ChangeRequest::Apply);

        assert!(matches!(result, Err(FuzzError::KindMismatch { .. })));
    }

    // ========== TEST: hidden_constraint_is_rejection ==========
    #[test]
    fn test_hidden_constraint_is_rejection() {
        // GIVEN items narrowed to Sub at runtime
        let mut fx = Fixture::new();
        let items = fx.prop("Folder", "items");
        let sub_t = fx.graph.registry().get_type_id("Sub").unwrap();
        fx.graph.restrict_target(items, sub_t);
        let root = fx.root;
        let config = FuzzConfig::new().with_value_strategy(ValueStrategy::InstantiateOnly);
        let mut fuzzer = fx.fuzzer(config);

        // WHEN adding repeatedly (Doc or Sub instantiated at random)
        let mut rejected = 0;
        for _ in 0..20 {
            let report = fuzzer
                .apply_change(root, items, ManyChangeKind::Add, ChangeRequest::ApplyAndUndo)
                .unwrap();
            if let ChangeOutcome::Rejected(Rejection::HiddenTypeConstraint(_)) = report.outcome {
                assert_eq!(report.undo, UndoOutcome::NothingToRevert);
                rejected += 1;
            }
        }

        // THEN some Doc candidates were refused and nothing stuck
        assert!(rejected > 0);
        assert_eq!(fuzzer.model().len(root, items).unwrap(), 0);
    }

    // ========== TEST: container_set_undo_restores_exact_slot ==========
    #[test]
    fn test_container_set_undo_restores_exact_slot() {
        // GIVEN root > [sub, a, b] and a reusable sub folder
        let mut fx = Fixture::new();
        let sub_t = fx.graph.registry().get_type_id("Sub").unwrap();
        let items = fx.prop("Folder", "items");
        let root = fx.root;
        let sub = fx.graph.create_node(sub_t).unwrap();
        fx.graph.insert(root, items, 0, Value::Node(sub)).unwrap();
        let a = fx.doc_in_root();
        fx.doc_in_root();
        let folder = fx.prop("Doc", "folder");
        let before = fx.graph.snapshot();
        let config = FuzzConfig::new().with_value_strategy(ValueStrategy::ReuseOnly);
        let mut fuzzer = fx.fuzzer(config);

        // WHEN setting a's folder with undo until it picked sub
        let mut reverted = 0;
        for _ in 0..10 {
            let report = fuzzer
                .apply_change(a, folder, SingleChangeKind::Set, ChangeRequest::ApplyAndUndo)
                .unwrap();
            if report.undo == UndoOutcome::Reverted {
                reverted += 1;
            }
            // THEN a is back at index 1 of root every time
            assert_eq!(
                fuzzer.model().slot_of(a).unwrap(),
                Some(Slot::Contained {
                    container: root,
                    property: items,
                    index: 1
                })
            );
        }
        assert!(reverted > 0);
        assert_eq!(before, fuzzer.model().snapshot());
    }

    // ========== TEST: set_to_absent_converts_for_primitive ==========
    #[test]
    fn test_set_to_absent_converts_for_primitive() {
        let mut fx = Fixture::new();
        let doc = fx.doc_in_root();
        let pages = fx.prop("Doc", "pages");
        fx.graph.set(doc, pages, Value::Int(12)).unwrap();
        let mut fuzzer = fx.fuzzer(FuzzConfig::new());

        let undone = fuzzer
            .apply_change(doc, pages, SingleChangeKind::SetToAbsent, ChangeRequest::ApplyAndUndo)
            .unwrap();
        let value_after_undo = fuzzer.model().get(doc, pages).unwrap();
        fuzzer
            .apply_change(doc, pages, SingleChangeKind::SetToAbsent, ChangeRequest::Apply)
            .unwrap();

        assert_eq!(undone.outcome, ChangeOutcome::Converted(Conversion::UnsetOfPrimitive));
        assert_eq!(undone.undo, UndoOutcome::Reverted);
        assert_eq!(value_after_undo, Value::Int(12));
        assert_eq!(fuzzer.model().get(doc, pages).unwrap(), Value::Int(0));
    }

    // ========== TEST: unset_before_set_prefix ==========
    #[test]
    fn test_unset_before_set_prefix() {
        // GIVEN recording on and a base_ prefixed property holding a value
        let mut fx = Fixture::new();
        let label = fx.prop("Folder", "base_label");
        let root = fx.root;
        fx.graph.set(root, label, Value::Text("old".into())).unwrap();
        fx.graph.set_recording(true);
        let mut fuzzer = fx.fuzzer(FuzzConfig::new());

        // WHEN set
        fuzzer.apply_change(root, label, SingleChangeKind::Set, ChangeRequest::Apply).unwrap();

        // THEN an unset notification precedes the set
        let kinds: Vec<_> = fuzzer.model_mut().take_notifications().into_iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                modelfuzz_graph::NotificationKind::Unset,
                modelfuzz_graph::NotificationKind::Set
            ]
        );
    }

    // ========== TEST: rejected_write_after_unset_restores_value ==========
    #[test]
    fn test_rejected_write_after_unset_restores_value() {
        // GIVEN a validator refusing every new label
        let mut fx = Fixture::new();
        let label = fx.prop("Folder", "base_label");
        let root = fx.root;
        fx.graph.set(root, label, Value::Text("old".into())).unwrap();
        fx.graph.add_validator("frozen", |_, _, def, value| {
            if def.name == "base_label" && value != &Value::Text("old".into()) {
                Err("label is frozen".to_string())
            } else {
                Ok(())
            }
        });
        let mut fuzzer = fx.fuzzer(FuzzConfig::new());

        // WHEN
        let report = fuzzer
            .apply_change(root, label, SingleChangeKind::Set, ChangeRequest::ApplyAndUndo)
            .unwrap();

        // THEN rejected, value restored, undo had nothing to do
        assert!(matches!(report.outcome, ChangeOutcome::Rejected(Rejection::ValidationRejected(_))));
        assert_eq!(report.undo, UndoOutcome::NothingToRevert);
        assert_eq!(fuzzer.model().get(root, label).unwrap(), Value::Text("old".into()));
    }

    // ========== TEST: failed_rollback_is_fatal ==========
    #[test]
    fn test_failed_rollback_is_fatal() {
        // GIVEN a validator that only lets the label be cleared
        let mut fx = Fixture::new();
        let label = fx.prop("Folder", "base_label");
        let root = fx.root;
        fx.graph.set(root, label, Value::Text("old".into())).unwrap();
        fx.graph.add_validator("only_null", |_, _, def, value| {
            if def.name == "base_label" && !value.is_null() {
                Err("only null allowed".to_string())
            } else {
                Ok(())
            }
        });
        let mut fuzzer = fx.fuzzer(FuzzConfig::new());

        // WHEN the write after the forced unset is refused, and so is the restore
        let result = fuzzer.apply_change(root, label, SingleChangeKind::Set, ChangeRequest::Apply);

        // THEN the run stops instead of reporting an unchanged model
        assert!(matches!(
            result,
            Err(FuzzError::Graph(GraphError::InvalidOperation(_)))
        ));
    }

    // ========== TEST: add_already_present_rejected ==========
    #[test]
    fn test_add_already_present_rejected() {
        // GIVEN a document whose unique refs already hold the only document
        let mut fx = Fixture::new();
        let doc = fx.doc_in_root();
        let refs = fx.prop("Doc", "refs");
        fx.graph.insert(doc, refs, 0, Value::Node(doc)).unwrap();
        let before = fx.graph.snapshot();
        let sink = MemorySink::new();
        let config = FuzzConfig::new()
            .with_value_strategy(ValueStrategy::ReuseOnly)
            .with_narration(true);
        let mut fuzzer = fx.fuzzer(config).with_sink(sink.clone());

        // WHEN
        let report = fuzzer
            .apply_change(doc, refs, ManyChangeKind::Add, ChangeRequest::ApplyAndUndo)
            .unwrap();

        // THEN
        assert_eq!(report.outcome, ChangeOutcome::Rejected(Rejection::AlreadyPresent));
        assert_eq!(report.undo, UndoOutcome::NothingToRevert);
        assert_eq!(before, fuzzer.model().snapshot());
        assert!(sink.contains("INVALID (because already in set)"));
    }

    // ========== TEST: add_ancestor_rejected_as_cycle ==========
    #[test]
    fn test_add_ancestor_rejected_as_cycle() {
        // GIVEN root > sub, and only folders to reuse
        let mut fx = Fixture::new();
        let sub_t = fx.graph.registry().get_type_id("Sub").unwrap();
        let items = fx.prop("Folder", "items");
        let root = fx.root;
        let sub = fx.graph.create_node(sub_t).unwrap();
        fx.graph.insert(root, items, 0, Value::Node(sub)).unwrap();
        let before = fx.graph.snapshot();
        let sink = MemorySink::new();
        let config = FuzzConfig::new()
            .with_value_strategy(ValueStrategy::ReuseOnly)
            .with_narration(true);
        let mut fuzzer = fx.fuzzer(config).with_sink(sink.clone());

        // WHEN adding to sub's items; the only Entry is sub itself
        let report = fuzzer
            .apply_change(sub, items, ManyChangeKind::Add, ChangeRequest::Apply)
            .unwrap();

        // THEN
        assert_eq!(report.outcome, ChangeOutcome::Rejected(Rejection::ContainmentCycle));
        assert_eq!(before, fuzzer.model().snapshot());
        assert!(sink.contains("INVALID (because would add containment cycle)"));
    }

    // ========== TEST: empty_model ==========
    #[test]
    fn test_empty_model() {
        // GIVEN every mutable property excluded
        let fx = Fixture::new();
        let config = FuzzConfig::new().with_excluded(["items", "cover", "base_label"]);
        let mut fuzzer = fx.fuzzer(config);

        let result = fuzzer.perform_one_change(ChangeRequest::Apply);

        assert!(matches!(result, Err(FuzzError::EmptyModel)));
    }

    // ========== TEST: single_set_without_candidate ==========
    #[test]
    fn test_single_set_without_candidate() {
        // GIVEN reuse only and no Doc reachable
        let fx = Fixture::new();
        let (root, cover) = (fx.root, fx.prop("Folder", "cover"));
        let before = fx.graph.snapshot();
        let mut fuzzer = fx.fuzzer(FuzzConfig::new().with_value_strategy(ValueStrategy::ReuseOnly));

        let report = fuzzer.apply_change(root, cover, SingleChangeKind::Set, ChangeRequest::Apply).unwrap();

        assert_eq!(report.outcome, ChangeOutcome::Rejected(Rejection::NoCandidate));
        assert_eq!(before, fuzzer.model().snapshot());
    }
}
