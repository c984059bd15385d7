//! Change reports and run summaries.

use crate::kinds::ChangeKind;
use crate::undo::UndoOutcome;
use modelfuzz_core::{GraphError, NodeId, PropertyId, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why an edit was not applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Rejection {
    /// No candidate value could be produced.
    NoCandidate,
    /// The candidate is already in a unique list.
    AlreadyPresent,
    /// The candidate would close a containment cycle.
    ContainmentCycle,
    /// The list is empty.
    EmptyCollection,
    /// The model enforces a narrower type than the schema declares.
    HiddenTypeConstraint(String),
    /// A model-level rule refused the write.
    ValidationRejected(String),
}

impl Rejection {
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::NoCandidate => "no_candidate",
            Rejection::AlreadyPresent => "already_present",
            Rejection::ContainmentCycle => "containment_cycle",
            Rejection::EmptyCollection => "empty_collection",
            Rejection::HiddenTypeConstraint(_) => "hidden_type_constraint",
            Rejection::ValidationRejected(_) => "validation_rejected",
        }
    }

    /// Map an expected accessor rejection; `None` for fatal errors.
    pub fn from_graph(err: &GraphError) -> Option<Self> {
        match err {
            GraphError::HiddenTypeConstraint { .. } => Some(Rejection::HiddenTypeConstraint(err.to_string())),
            GraphError::ValidationRejected { .. } => Some(Rejection::ValidationRejected(err.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoCandidate => write!(f, "no possible value"),
            Rejection::AlreadyPresent => write!(f, "already in set"),
            Rejection::ContainmentCycle => write!(f, "would add containment cycle"),
            Rejection::EmptyCollection => write!(f, "empty collection"),
            Rejection::HiddenTypeConstraint(reason) => write!(f, "hidden typing constraint: {}", reason),
            Rejection::ValidationRejected(reason) => write!(f, "{}", reason),
        }
    }
}

/// An edit replaced by a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conversion {
    /// Remove on an empty list became a clear.
    ClearOfEmpty,
    /// Writing the absent marker to a non-nullable primitive became an unset.
    UnsetOfPrimitive,
}

impl Conversion {
    pub fn label(&self) -> &'static str {
        match self {
            Conversion::ClearOfEmpty => "clear_of_empty",
            Conversion::UnsetOfPrimitive => "unset_of_primitive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChangeOutcome {
    Applied,
    Rejected(Rejection),
    Converted(Conversion),
}

/// The result of one engine call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    pub node: NodeId,
    pub property: PropertyId,
    pub property_name: String,
    pub kind: ChangeKind,
    /// Candidate produced for kinds that need one.
    pub candidate: Option<Value>,
    /// List position touched, if any.
    pub index: Option<usize>,
    pub outcome: ChangeOutcome,
    pub undo: UndoOutcome,
}

/// Outcome counts over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub steps: usize,
    pub applied: usize,
    pub rejected: usize,
    pub converted: usize,
    pub reverted: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub rejections: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn record(&mut self, report: &ChangeReport) {
        self.steps += 1;
        *self.by_kind.entry(report.kind.to_string()).or_default() += 1;
        match &report.outcome {
            ChangeOutcome::Applied => self.applied += 1,
            ChangeOutcome::Rejected(rejection) => {
                self.rejected += 1;
                *self.rejections.entry(rejection.label().to_string()).or_default() += 1;
            }
            ChangeOutcome::Converted(_) => self.converted += 1,
        }
        if report.undo == UndoOutcome::Reverted {
            self.reverted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{ManyChangeKind, SingleChangeKind};
    use pretty_assertions::assert_eq;

    fn report(kind: ChangeKind, outcome: ChangeOutcome, undo: UndoOutcome) -> ChangeReport {
        ChangeReport {
            node: NodeId::new(1),
            property: PropertyId::new(0),
            property_name: "books".to_string(),
            kind,
            candidate: None,
            index: None,
            outcome,
            undo,
        }
    }

    // ========== TEST: summary_counts ==========
    #[test]
    fn test_summary_counts() {
        // GIVEN an applied-and-reverted add, a rejected set, a converted remove
        let mut summary = RunSummary::default();
        let reports = [
            report(ManyChangeKind::Add.into(), ChangeOutcome::Applied, UndoOutcome::Reverted),
            report(
                SingleChangeKind::Set.into(),
                ChangeOutcome::Rejected(Rejection::NoCandidate),
                UndoOutcome::NotRequested,
            ),
            report(
                ManyChangeKind::Remove.into(),
                ChangeOutcome::Converted(Conversion::ClearOfEmpty),
                UndoOutcome::NotRequested,
            ),
        ];

        // WHEN
        for r in &reports {
            summary.record(r);
        }

        // THEN
        assert_eq!(summary.steps, 3);
        assert_eq!((summary.applied, summary.rejected, summary.converted), (1, 1, 1));
        assert_eq!(summary.reverted, 1);
        assert_eq!(summary.rejections.get("no_candidate"), Some(&1));
        assert_eq!(summary.by_kind.get("ADD"), Some(&1));
    }

    // ========== TEST: rejection_from_graph ==========
    #[test]
    fn test_rejection_from_graph() {
        let hidden = GraphError::HiddenTypeConstraint {
            property: "featured".into(),
            required: "Book".into(),
            actual: "Member".into(),
        };

        assert!(matches!(Rejection::from_graph(&hidden), Some(Rejection::HiddenTypeConstraint(_))));
        assert_eq!(Rejection::from_graph(&GraphError::InvalidOperation("x".into())), None);
    }
}
