//! Modelfuzz Engine
//!
//! Randomly mutates a schema-described model while keeping every mutation
//! structurally legal:
//! - Schema cache: concrete subtypes and mutable properties per node type
//! - Value generator: one candidate value for a property
//! - Legality checks: containment acyclicity and declared uniqueness
//! - Mutation engine: target selection, per-arity edit algorithms and
//!   optional immediate single-step undo
//! - Diagnostics: optional narration of every decision

pub mod cache;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod generator;
pub mod invariants;
pub mod kinds;
pub mod legality;
pub mod model;
pub mod report;
pub mod trace;
pub mod undo;

pub use cache::SchemaCache;
pub use config::{FuzzConfig, ValueStrategy};
pub use engine::ModelFuzzer;
pub use error::{FuzzError, FuzzResult};
pub use generator::{Candidate, ValueGenerator};
pub use invariants::InvariantViolation;
pub use kinds::{ChangeKind, ManyChangeKind, SingleChangeKind};
pub use model::Model;
pub use report::{ChangeOutcome, ChangeReport, Conversion, Rejection, RunSummary};
pub use trace::{DiagnosticsSink, MemorySink, TracingSink};
pub use undo::{ChangeRequest, UndoOutcome};
