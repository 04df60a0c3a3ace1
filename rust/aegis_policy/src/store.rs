//! Typed facade over the remote policy store.
//!
//! Wraps the generic invoker with the store's fixed wire contract: a
//! listing query for existence checks plus grant and revoke mutations, each
//! taking a serialized grant structure (grantee + permission array). Every
//! mutation logs a begin event before the call and a success event after.

use serde_json::{json, Value};

use aegis_mgmt::{sig, Invoker, Locator, LogicalName, MgmtError, ObjectName};

use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::subject::{Permission, Subject, SubjectKind};

/// Listing query: permissions currently granted to one grantee.
pub const OP_LIST_GRANTS: &str = "listGrants";
/// Grant mutation: add a batch of permissions to a grantee.
pub const OP_GRANT: &str = "grantToPolicy";
/// Revoke mutation: remove a batch of permissions from a grantee.
pub const OP_REVOKE: &str = "revokeFromPolicy";

/// Handle-bound view of the remote policy store.
pub struct PolicyStore<'a> {
    invoker: &'a Invoker<'a>,
    handle: ObjectName,
    sink: &'a dyn EventSink,
}

impl std::fmt::Debug for PolicyStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<'a> PolicyStore<'a> {
    /// Bind to an already resolved store handle.
    pub fn new(invoker: &'a Invoker<'a>, handle: ObjectName, sink: &'a dyn EventSink) -> Self {
        Self {
            invoker,
            handle,
            sink,
        }
    }

    /// Resolve the global policy store and bind to it.
    pub fn open(
        locator: &Locator<'_>,
        invoker: &'a Invoker<'a>,
        sink: &'a dyn EventSink,
    ) -> Result<Self> {
        let handle = locator.resolve(LogicalName::PolicyStore)?;
        Ok(Self::new(invoker, handle, sink))
    }

    /// Permissions the store currently reports for a subject.
    pub fn grants_of(&self, subject: &Subject) -> Result<Vec<Permission>> {
        let reply = self.invoker.invoke(
            &self.handle,
            OP_LIST_GRANTS,
            &[grantee_value(subject)],
            &[sig::COMPOSITE],
        )?;
        let entries = reply
            .as_array()
            .ok_or_else(|| MgmtError::InvocationFailed {
                operation: OP_LIST_GRANTS.to_string(),
                cause: format!("expected a permission array, got {reply}"),
            })?;
        let mut permissions = Vec::with_capacity(entries.len());
        for entry in entries {
            let permission: Permission = serde_json::from_value(entry.clone()).map_err(|e| {
                MgmtError::InvocationFailed {
                    operation: OP_LIST_GRANTS.to_string(),
                    cause: format!("unparseable permission descriptor: {e}"),
                }
            })?;
            permissions.push(permission);
        }
        Ok(permissions)
    }

    /// Whether the store reports at least one permission for the subject.
    pub fn exists(&self, subject: &Subject) -> Result<bool> {
        Ok(!self.grants_of(subject)?.is_empty())
    }

    /// Add a batch of permissions to the subject's grants.
    pub fn grant(&self, subject: &Subject, permissions: &[Permission]) -> Result<()> {
        self.mutate(subject, permissions, OP_GRANT)
    }

    /// Remove a batch of permissions from the subject's grants.
    pub fn revoke(&self, subject: &Subject, permissions: &[Permission]) -> Result<()> {
        self.mutate(subject, permissions, OP_REVOKE)
    }

    fn mutate(&self, subject: &Subject, permissions: &[Permission], operation: &str) -> Result<()> {
        self.sink
            .emit(Event::begin(subject.entity(), &subject.name, operation));
        self.invoker.invoke(
            &self.handle,
            operation,
            &[json!([grant_value(subject, permissions)])],
            &[sig::COMPOSITE_ARRAY],
        )?;
        self.sink
            .emit(Event::success(subject.entity(), &subject.name, operation));
        Ok(())
    }
}

/// Wire form of the grantee, dispatched on subject kind.
pub(crate) fn grantee_value(subject: &Subject) -> Value {
    match &subject.kind {
        SubjectKind::Principal { class, kind } => {
            let kind = match kind {
                crate::subject::PrincipalKind::User => "user",
                crate::subject::PrincipalKind::Role => "role",
            };
            json!({
                "principal": {
                    "class": class,
                    "kind": kind,
                    "name": subject.name,
                }
            })
        }
        SubjectKind::Codebase => json!({
            "codebase": {
                "location": subject.name,
            }
        }),
    }
}

/// Wire form of one grant: grantee plus permission array. Built fresh per
/// mutation call, never kept.
pub(crate) fn grant_value(subject: &Subject, permissions: &[Permission]) -> Value {
    json!({
        "grantee": grantee_value(subject),
        "permissions": permissions,
    })
}
