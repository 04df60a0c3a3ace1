//! The two-phase policy reconciliation algorithm.
//!
//! Phase one withdraws every subject in the revoke set; phase two asserts
//! every subject in the assign set, clearing stale grants before granting.
//! The phases are strictly sequential and subjects are processed in
//! declaration order, so the store is never observed holding both the old
//! and the new grant for an identity at once.
//!
//! Absent-on-revoke and present-on-assign are soft conditions: they are
//! reported and recorded, never escalated, because they mean the desired
//! state already holds. Hard invocation failures follow the caller's
//! fail-fast-vs-continue policy.

use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::request::ReconciliationRequest;
use crate::store::PolicyStore;
use crate::subject::{Permission, Subject, SubjectId};

/// Caller's error policy for one reconciliation run.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Abort on the first hard failure instead of recording it and moving
    /// on to the next subject.
    pub fail_on_error: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { fail_on_error: true }
    }
}

/// What happened to one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The declared revoke set was withdrawn.
    Revoked,
    /// The declared assign set was granted.
    Granted,
    /// The subject declared nothing for this direction.
    SkippedNoOp,
    /// Soft: the store holds nothing to revoke for this subject.
    NotFound,
    /// Soft: the subject still holds grants after the clear, assignment
    /// skipped.
    AlreadyExists,
    /// Hard failure recorded under the continue-on-error policy.
    Failed(String),
}

impl Outcome {
    /// Soft conditions mean the desired state already holds.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NotFound | Self::AlreadyExists | Self::SkippedNoOp)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-subject result in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub subject: SubjectId,
    pub outcome: Outcome,
}

/// Result of one reconciliation run.
#[derive(Debug, Default)]
pub struct Report {
    pub entries: Vec<Entry>,
    /// Both phases ran to the end (possibly with recorded failures).
    pub completed: bool,
}

impl Report {
    fn push(&mut self, subject: SubjectId, outcome: Outcome) {
        self.entries.push(Entry { subject, outcome });
    }

    /// Number of hard failures recorded.
    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.is_failure())
            .count()
    }

    /// Whether the run recorded no hard failures.
    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Drives a [`ReconciliationRequest`] against the remote policy store.
pub struct Reconciler<'a> {
    store: &'a PolicyStore<'a>,
    sink: &'a dyn EventSink,
    options: Options,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a PolicyStore<'a>, sink: &'a dyn EventSink, options: Options) -> Self {
        Self {
            store,
            sink,
            options,
        }
    }

    /// Validate and apply the request. Validation failures abort before any
    /// remote call; partial progress on hard failure stays committed (the
    /// store offers no rollback).
    pub fn execute(&self, request: ReconciliationRequest) -> Result<Report> {
        request.validate()?;

        let mut report = Report::default();
        for subject in request.revoke() {
            let outcome = self.guard(self.revoke_subject(subject), subject)?;
            report.push(subject.id(), outcome);
        }
        for subject in request.assign() {
            let outcome = self.guard(self.assign_subject(subject), subject)?;
            report.push(subject.id(), outcome);
        }
        report.completed = true;
        Ok(report)
    }

    /// Apply the caller's error policy to one subject's result.
    fn guard(&self, result: Result<Outcome>, subject: &Subject) -> Result<Outcome> {
        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if self.options.fail_on_error => Err(err),
            Err(err) => {
                let cause = err.to_string();
                self.sink.emit(Event::failure(
                    subject.entity(),
                    &subject.name,
                    "reconcile",
                    &cause,
                ));
                Ok(Outcome::Failed(cause))
            }
        }
    }

    fn revoke_subject(&self, subject: &Subject) -> Result<Outcome> {
        if subject.revoke.is_empty() {
            tracing::debug!(subject = %subject.id(), "nothing declared to revoke, skipping");
            return Ok(Outcome::SkippedNoOp);
        }
        let current = self.store.grants_of(subject)?;
        if current.is_empty() {
            self.sink
                .emit(Event::not_found(subject.entity(), &subject.name));
            return Ok(Outcome::NotFound);
        }
        // narrow to the permissions the store actually reports
        let delta = retained(&subject.revoke, &current);
        if delta.is_empty() {
            self.sink
                .emit(Event::not_found(subject.entity(), &subject.name));
            return Ok(Outcome::NotFound);
        }
        self.store.revoke(subject, &delta)?;
        Ok(Outcome::Revoked)
    }

    fn assign_subject(&self, subject: &Subject) -> Result<Outcome> {
        if subject.assign.is_empty() {
            tracing::debug!(subject = %subject.id(), "nothing declared to assign, skipping");
            return Ok(Outcome::SkippedNoOp);
        }
        // clear stale prior grants before re-asserting desired state; the
        // store treats re-granting to an existing subject as an error, not
        // a merge
        let mut current = self.store.grants_of(subject)?;
        if !current.is_empty() && !subject.revoke.is_empty() {
            let clear = retained(&subject.revoke, &current);
            if !clear.is_empty() {
                self.store.revoke(subject, &clear)?;
                current = self.store.grants_of(subject)?;
            }
        }
        if !current.is_empty() {
            self.sink
                .emit(Event::already_exists(subject.entity(), &subject.name));
            return Ok(Outcome::AlreadyExists);
        }
        self.store.grant(subject, &subject.assign)?;
        Ok(Outcome::Granted)
    }
}

/// Permissions from `declared` that the store currently reports.
fn retained(declared: &[Permission], current: &[Permission]) -> Vec<Permission> {
    declared
        .iter()
        .filter(|permission| current.contains(permission))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests;
