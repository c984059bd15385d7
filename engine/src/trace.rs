//! Diagnostics narration.
//!
//! Narration describes each decision in one human-readable line. It never
//! influences what the engine does.

use std::cell::RefCell;
use std::rc::Rc;

/// Receives narration lines.
pub trait DiagnosticsSink {
    fn line(&mut self, line: &str);
}

/// Emits every line as a `tracing` event under `modelfuzz::trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn line(&mut self, line: &str) {
        tracing::info!(target: "modelfuzz::trace", "{}", line);
    }
}

/// Keeps lines in a shared buffer. Clones share the buffer, so a test can
/// hand one clone to the engine and read the other.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(fragment))
    }
}

impl DiagnosticsSink for MemorySink {
    fn line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

/// Forwards lines to a sink when narration is on. Lines are built lazily.
pub(crate) struct Narrator {
    enabled: bool,
    sink: Box<dyn DiagnosticsSink>,
}

impl Narrator {
    pub(crate) fn new(enabled: bool, sink: Box<dyn DiagnosticsSink>) -> Self {
        Self { enabled, sink }
    }

    pub(crate) fn say(&mut self, line: impl FnOnce() -> String) {
        if self.enabled {
            self.sink.line(&line());
        }
    }

    pub(crate) fn replace_sink(&mut self, sink: Box<dyn DiagnosticsSink>) {
        self.sink = sink;
    }
}
