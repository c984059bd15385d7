//! Modelfuzz Graph Storage
//!
//! This crate provides the in-memory model the fuzzing engine mutates:
//! - Node storage with a list of root nodes
//! - Containment tracking: every node knows the slot it occupies, and
//!   writing a containment or container property moves nodes between slots
//! - The accessor protocol (get/set/unset, insert/remove/move/replace)
//! - Write guards: runtime type restrictions narrower than the schema and
//!   opaque validation rules
//! - Change notifications and snapshots of the observable state

mod graph;
mod guard;
mod notify;
mod ops;
mod snapshot;

pub use graph::Graph;
pub use guard::Validator;
pub use notify::{Notification, NotificationKind};
pub use snapshot::{NodeState, Snapshot};
