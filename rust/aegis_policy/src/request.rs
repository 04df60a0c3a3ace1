//! Reconciliation request: the declared desired state, accumulated and
//! validated before any remote call is issued.

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};
use crate::subject::Subject;

/// Two disjoint-by-identity sets of subjects: those whose permissions are
/// asserted and those whose permissions are withdrawn.
///
/// Declaration order is preserved; the reconciler processes each set in the
/// order subjects were added.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationRequest {
    assign: Vec<Subject>,
    revoke: Vec<Subject>,
}

/// Serde-facing shape; construction goes through the duplicate checks.
#[derive(Deserialize)]
struct RawRequest {
    #[serde(default)]
    assign: Vec<Subject>,
    #[serde(default)]
    revoke: Vec<Subject>,
}

impl ReconciliationRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declared request from JSON, enforcing the same uniqueness
    /// rules as incremental construction.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawRequest = serde_json::from_str(json)?;
        let mut request = Self::new();
        for subject in raw.assign {
            request.add_assign(subject)?;
        }
        for subject in raw.revoke {
            request.add_revoke(subject)?;
        }
        Ok(request)
    }

    /// Declare a subject whose permissions are to be asserted.
    pub fn add_assign(&mut self, subject: Subject) -> Result<()> {
        Self::push_unique(&mut self.assign, subject)
    }

    /// Declare a subject whose permissions are to be withdrawn.
    pub fn add_revoke(&mut self, subject: Subject) -> Result<()> {
        Self::push_unique(&mut self.revoke, subject)
    }

    fn push_unique(set: &mut Vec<Subject>, subject: Subject) -> Result<()> {
        let id = subject.id();
        if set.iter().any(|existing| existing.id() == id) {
            return Err(PolicyError::DuplicateSubject {
                name: id.to_string(),
            });
        }
        set.push(subject);
        Ok(())
    }

    /// Subjects to assert, in declaration order.
    pub fn assign(&self) -> &[Subject] {
        &self.assign
    }

    /// Subjects to withdraw, in declaration order.
    pub fn revoke(&self) -> &[Subject] {
        &self.revoke
    }

    /// Validate the request: it must declare at least one subject, and
    /// every subject must meet its structural constraints.
    pub fn validate(&self) -> Result<()> {
        if self.assign.is_empty() && self.revoke.is_empty() {
            return Err(PolicyError::EmptyRequest);
        }
        for subject in self.assign.iter().chain(self.revoke.iter()) {
            subject.validate()?;
        }
        Ok(())
    }
}
