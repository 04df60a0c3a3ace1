//! Structured reconciliation events.
//!
//! The reconciler reports through a single [`EventSink`] so severity and
//! formatting policy stay out of the algorithm. The default sink forwards
//! to `tracing`; tests install a [`RecordingSink`] and assert on the exact
//! sequence.

use std::sync::Mutex;

/// Severity of a reconciliation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// One reconciliation event: what happened, to which subject, in which
/// operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    /// Entity label: `principal`, `codebase` or `server`.
    pub entity: String,
    /// Identity string of the subject or server.
    pub name: String,
    /// Operation the event belongs to.
    pub operation: String,
    /// Optional detail, e.g. a cause message or an observed state.
    pub detail: Option<String>,
}

impl Event {
    fn new(severity: Severity, entity: &str, name: &str, operation: &str) -> Self {
        Self {
            severity,
            entity: entity.to_string(),
            name: name.to_string(),
            operation: operation.to_string(),
            detail: None,
        }
    }

    /// A mutating operation is about to be issued.
    pub fn begin(entity: &str, name: &str, operation: &str) -> Self {
        Self::new(Severity::Warning, entity, name, operation)
            .with_detail("begin")
    }

    /// A mutating operation completed.
    pub fn success(entity: &str, name: &str, operation: &str) -> Self {
        Self::new(Severity::Info, entity, name, operation).with_detail("success")
    }

    /// Soft condition: the subject has nothing to revoke.
    pub fn not_found(entity: &str, name: &str) -> Self {
        Self::new(Severity::Warning, entity, name, "exists").with_detail("not found")
    }

    /// Soft condition: the subject already holds grants, assignment skipped.
    pub fn already_exists(entity: &str, name: &str) -> Self {
        Self::new(Severity::Warning, entity, name, "exists").with_detail("already exists")
    }

    /// Hard failure for one subject.
    pub fn failure(entity: &str, name: &str, operation: &str, cause: &str) -> Self {
        Self::new(Severity::Fatal, entity, name, operation).with_detail(cause)
    }

    /// Read-only observation, e.g. a server state line.
    pub fn observed(entity: &str, name: &str, detail: &str) -> Self {
        Self::new(Severity::Info, entity, name, "status").with_detail(detail)
    }

    fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

/// Sink the reconciler reports events into.
pub trait EventSink {
    fn emit(&self, event: Event);
}

/// Default sink: forwards events to `tracing` at the event's severity.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        let detail = event.detail.as_deref().unwrap_or("");
        match event.severity {
            Severity::Info => tracing::info!(
                entity = %event.entity, name = %event.name, operation = %event.operation, detail, ""
            ),
            Severity::Warning => tracing::warn!(
                entity = %event.entity, name = %event.name, operation = %event.operation, detail, ""
            ),
            Severity::Error => tracing::error!(
                entity = %event.entity, name = %event.name, operation = %event.operation, detail, ""
            ),
            Severity::Fatal => tracing::error!(
                entity = %event.entity, name = %event.name, operation = %event.operation, detail,
                fatal = true, ""
            ),
        }
    }
}

/// Sink that records every event, for asserting sequences in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
