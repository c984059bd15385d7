//! Change notifications.
//!
//! When recording is on, every structural or value change appends one
//! notification. Root list changes carry no notifier.

use crate::Graph;
use modelfuzz_core::{NodeId, PropertyId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Set,
    Unset,
    Add,
    Remove,
    Move,
}

/// A single recorded change.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Node whose property changed, `None` for the root list.
    pub notifier: Option<NodeId>,
    pub property: Option<PropertyId>,
    pub old: Value,
    pub new: Value,
    /// List position affected, if any.
    pub position: Option<usize>,
    /// Previous position of a moved element.
    pub from: Option<usize>,
}

impl Notification {
    pub fn new(kind: NotificationKind, notifier: Option<NodeId>, property: Option<PropertyId>) -> Self {
        Self {
            kind,
            notifier,
            property,
            old: Value::Null,
            new: Value::Null,
            position: None,
            from: None,
        }
    }

    pub fn with_old(mut self, old: Value) -> Self {
        self.old = old;
        self
    }

    pub fn with_new(mut self, new: Value) -> Self {
        self.new = new;
        self
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn moved_from(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }
}

impl Graph {
    /// Turn notification recording on or off. Turning it off drops anything
    /// not yet taken.
    pub fn set_recording(&mut self, on: bool) {
        self.recording = on;
        if !on {
            self.notifications.clear();
        }
    }

    /// Notifications recorded since the last take.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drain the recorded notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
