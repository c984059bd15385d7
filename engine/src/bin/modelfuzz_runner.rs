//! Runner for model fuzzing sessions
//!
//! This binary builds the library demo model, fuzzes it for a number of
//! steps and checks the structural invariants after every step.
//!
//! Usage:
//!   cargo run -p modelfuzz-engine --bin modelfuzz-runner -- [OPTIONS]
//!
//! Options:
//!   --seed <N>          Random seed for reproducibility (default: 42)
//!   --steps <N>         Number of changes to perform (default: 200)
//!   --undo-every <N>    Request undo on every Nth step (default: 0, never)
//!   --exclude <NAME>    Never mutate properties with this name (repeatable)
//!   --config <FILE>     Load a JSON FuzzConfig; flags override it
//!   --json              Print the summary as JSON
//!   --verbose           Narrate every decision

use modelfuzz_engine::demo;
use modelfuzz_engine::invariants::{self, InvariantViolation};
use modelfuzz_engine::{ChangeRequest, FuzzConfig, FuzzError, ModelFuzzer, RunSummary, UndoOutcome};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match build_config(&options) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(2);
        }
    };

    match run(&options, config) {
        Ok(outcome) => {
            print_outcome(&outcome, options.json_output);
            if !outcome.violations.is_empty() || !outcome.undo_mismatches.is_empty() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

#[derive(Debug)]
struct RunOptions {
    seed: Option<u64>,
    steps: usize,
    undo_every: usize,
    excluded: Vec<String>,
    config_path: Option<PathBuf>,
    json_output: bool,
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct RunOutcome {
    seed: u64,
    summary: RunSummary,
    /// Step index and the violations found after it.
    violations: Vec<(usize, InvariantViolation)>,
    /// Steps whose undo left the reachable state changed.
    undo_mismatches: Vec<usize>,
    final_node_count: usize,
    /// Unreachable nodes dropped between steps.
    collected: usize,
}

fn parse_args(args: &[String]) -> RunOptions {
    let mut options = RunOptions {
        seed: None,
        steps: 200,
        undo_every: 0,
        excluded: Vec::new(),
        config_path: None,
        json_output: false,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                if i < args.len() {
                    options.seed = args[i].parse().ok();
                }
            }
            "--steps" => {
                i += 1;
                if i < args.len() {
                    options.steps = args[i].parse().unwrap_or(200);
                }
            }
            "--undo-every" => {
                i += 1;
                if i < args.len() {
                    options.undo_every = args[i].parse().unwrap_or(0);
                }
            }
            "--exclude" => {
                i += 1;
                if i < args.len() {
                    options.excluded.push(args[i].clone());
                }
            }
            "--config" => {
                i += 1;
                if i < args.len() {
                    options.config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--json" => options.json_output = true,
            "--verbose" => options.verbose = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => eprintln!("ignoring unknown argument {}", other),
        }
        i += 1;
    }

    options
}

fn print_help() {
    println!(
        r#"Model Fuzz Runner

USAGE:
    cargo run -p modelfuzz-engine --bin modelfuzz-runner -- [OPTIONS]

OPTIONS:
    --seed <N>          Random seed for reproducibility (default: 42)
    --steps <N>         Number of changes to perform (default: 200)
    --undo-every <N>    Request undo on every Nth step (default: never)
    --exclude <NAME>    Never mutate properties with this name (repeatable)
    --config <FILE>     Load a JSON FuzzConfig; flags override it
    --json              Print the summary as JSON
    --verbose           Narrate every decision
    --help, -h          Print this help message

ENVIRONMENT:
    RUST_LOG            Log filter (default: info)
"#
    );
}

fn build_config(options: &RunOptions) -> Result<FuzzConfig, FuzzError> {
    let mut config = match &options.config_path {
        Some(path) => {
            let source = fs::read_to_string(path)
                .map_err(|e| FuzzError::config(format!("cannot read {}: {}", path.display(), e)))?;
            FuzzConfig::from_json(&source)?
        }
        None => FuzzConfig::new(),
    };
    if let Some(seed) = options.seed {
        config = config.with_seed(seed);
    }
    if options.verbose {
        config = config.with_narration(true);
    }
    Ok(config.with_excluded(options.excluded.iter().cloned()))
}

fn run(options: &RunOptions, config: FuzzConfig) -> Result<RunOutcome, FuzzError> {
    let seed = config.seed;
    let model = demo::library_model()?;
    let mut fuzzer = ModelFuzzer::new(model, config);
    tracing::info!(seed, steps = options.steps, "fuzzing library model");

    let mut summary = RunSummary::default();
    let mut violations = Vec::new();
    let mut undo_mismatches = Vec::new();
    let mut collected = 0;

    for step in 0..options.steps {
        let request = if options.undo_every > 0 && (step + 1) % options.undo_every == 0 {
            ChangeRequest::ApplyAndUndo
        } else {
            ChangeRequest::Apply
        };

        let before = request.wants_undo().then(|| fuzzer.model().reachable_snapshot());
        let report = fuzzer.perform_one_change(request)?;
        summary.record(&report);

        if let Some(before) = before {
            if report.undo == UndoOutcome::Reverted && before != fuzzer.model().reachable_snapshot() {
                tracing::error!(step, property = %report.property_name, "undo did not restore the model");
                undo_mismatches.push(step);
            }
        }

        for violation in invariants::check_all(fuzzer.model()) {
            tracing::error!(step, "{}", violation);
            violations.push((step, violation));
        }
        collected += fuzzer.model_mut().collect_garbage();
    }

    Ok(RunOutcome {
        seed,
        summary,
        violations,
        undo_mismatches,
        final_node_count: fuzzer.model().all_contents().len(),
        collected,
    })
}

fn print_outcome(outcome: &RunOutcome, json: bool) {
    if json {
        match serde_json::to_string_pretty(outcome) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("ERROR: cannot serialize summary: {}", e),
        }
        return;
    }

    let summary = &outcome.summary;
    println!("════════════════════════════════════════════════════════════════");
    println!("                         SUMMARY                                ");
    println!("════════════════════════════════════════════════════════════════");
    println!("Seed:             {}", outcome.seed);
    println!("Steps:            {}", summary.steps);
    println!("Applied:          {}", summary.applied);
    println!("Converted:        {}", summary.converted);
    println!("Rejected:         {}", summary.rejected);
    println!("Reverted:         {}", summary.reverted);
    println!("Reachable nodes:  {}", outcome.final_node_count);
    println!("Collected nodes:  {}", outcome.collected);

    if !summary.by_kind.is_empty() {
        println!("\nBy kind:");
        for (kind, count) in &summary.by_kind {
            println!("  {:<12} {}", kind, count);
        }
    }
    if !summary.rejections.is_empty() {
        println!("\nRejections:");
        for (reason, count) in &summary.rejections {
            println!("  {:<24} {}", reason, count);
        }
    }

    if outcome.violations.is_empty() && outcome.undo_mismatches.is_empty() {
        println!("\n✓ All invariants held");
    } else {
        for (step, violation) in &outcome.violations {
            println!("  step {}: {}", step, violation);
        }
        for step in &outcome.undo_mismatches {
            println!("  step {}: undo did not restore the model", step);
        }
        println!("\n⚠ Invariant violations found");
    }
}
