//! # Property-Based Tests
//!
//! Structural guarantees of the engine over random seeds and run lengths.

use modelfuzz_engine::demo;
use modelfuzz_engine::invariants;
use modelfuzz_engine::{ChangeRequest, FuzzConfig, MemorySink, ModelFuzzer, UndoOutcome, ValueStrategy};
use proptest::prelude::*;

fn strategy() -> impl Strategy<Value = ValueStrategy> {
    prop_oneof![
        Just(ValueStrategy::Mixed),
        Just(ValueStrategy::ReuseOnly),
        Just(ValueStrategy::InstantiateOnly),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// No step ever closes a containment cycle or duplicates a unique value.
    #[test]
    fn invariants_hold_after_every_step(seed in any::<u64>(), steps in 1usize..80, values in strategy()) {
        let config = FuzzConfig::new().with_seed(seed).with_value_strategy(values);
        let mut fuzzer = ModelFuzzer::new(demo::library_model().expect("library"), config);

        for _ in 0..steps {
            fuzzer.perform_one_change(ChangeRequest::Apply).expect("change");
            prop_assert!(invariants::check_acyclic(fuzzer.model()).is_empty());
            prop_assert!(invariants::check_unique(fuzzer.model()).is_empty());
            prop_assert!(invariants::check_containers(fuzzer.model()).is_empty());
        }
    }

    /// With undo requested, every step leaves the reachable model unchanged.
    #[test]
    fn undo_round_trip(seed in any::<u64>(), warmup in 0usize..40, steps in 1usize..40) {
        let config = FuzzConfig::new().with_seed(seed);
        let mut fuzzer = ModelFuzzer::new(demo::library_model().expect("library"), config);
        fuzzer.run(warmup).expect("warmup");

        for _ in 0..steps {
            let before = fuzzer.model().reachable_snapshot();
            let report = fuzzer.perform_one_change(ChangeRequest::ApplyAndUndo).expect("change");

            prop_assert_ne!(report.undo, UndoOutcome::NotRequested);
            prop_assert_eq!(&before, &fuzzer.model().reachable_snapshot());
        }
    }

    /// Same seed, same start model and same calls narrate the same lines and
    /// end in the same state.
    #[test]
    fn determinism(seed in any::<u64>(), steps in 1usize..60, undo_every in 1usize..5) {
        let run = || {
            let sink = MemorySink::new();
            let config = FuzzConfig::new().with_seed(seed).with_narration(true);
            let mut fuzzer = ModelFuzzer::new(demo::library_model().expect("library"), config)
                .with_sink(sink.clone());
            let summary = fuzzer
                .run_with(steps, |step| {
                    if step % undo_every == 0 {
                        ChangeRequest::ApplyAndUndo
                    } else {
                        ChangeRequest::Apply
                    }
                })
                .expect("run");
            (sink.lines(), summary, fuzzer.into_model().snapshot())
        };

        let (lines_a, summary_a, state_a) = run();
        let (lines_b, summary_b, state_b) = run();

        prop_assert!(!lines_a.is_empty());
        prop_assert_eq!(lines_a, lines_b);
        prop_assert_eq!(summary_a, summary_b);
        prop_assert_eq!(state_a, state_b);
    }
}
