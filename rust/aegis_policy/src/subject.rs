//! Domain model of the policy store: permissions and the subjects they are
//! granted to.

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// Identity class reported for principals the store does not qualify
/// further.
pub const DEFAULT_PRINCIPAL_CLASS: &str = "aegis.security.Principal";

/// A single permission descriptor.
///
/// Two descriptors are the same permission when class, target and actions
/// all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Permission class, e.g. `aegis.io.FilePermission`.
    pub class: String,
    /// The resource the permission applies to.
    #[serde(default)]
    pub target: String,
    /// Comma-separated action list, empty when the class has none.
    #[serde(default)]
    pub actions: String,
}

impl Permission {
    /// Create a permission descriptor.
    pub fn new(class: &str, target: &str, actions: &str) -> Self {
        Self {
            class: class.to_string(),
            target: target.to_string(),
            actions: actions.to_string(),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}", self.class, self.target)?;
        if !self.actions.is_empty() {
            write!(f, ", {}", self.actions)?;
        }
        write!(f, ")")
    }
}

/// Kind of a named principal identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Role,
}

/// The two shapes a grant subject can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum SubjectKind {
    /// A named identity (user or role) with an identity class.
    Principal { class: String, kind: PrincipalKind },
    /// A code location; the subject name is the location itself.
    Codebase,
}

/// A declared grant subject: who (or what code) the permissions apply to,
/// and the permission sets to assign and to revoke.
///
/// A subject with both sets empty is a no-op; reconciliation skips it
/// without error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Identity string: principal name or codebase location.
    pub name: String,
    #[serde(flatten)]
    pub kind: SubjectKind,
    /// Permissions to add.
    #[serde(default)]
    pub assign: Vec<Permission>,
    /// Permissions to remove.
    #[serde(default)]
    pub revoke: Vec<Permission>,
}

impl Subject {
    /// Create a principal subject with the default identity class.
    pub fn principal(name: &str, kind: PrincipalKind) -> Self {
        Self {
            name: name.to_string(),
            kind: SubjectKind::Principal {
                class: DEFAULT_PRINCIPAL_CLASS.to_string(),
                kind,
            },
            assign: Vec::new(),
            revoke: Vec::new(),
        }
    }

    /// Create a codebase subject from a location URL.
    pub fn codebase(location: &str) -> Self {
        Self {
            name: location.to_string(),
            kind: SubjectKind::Codebase,
            assign: Vec::new(),
            revoke: Vec::new(),
        }
    }

    /// Override the principal identity class.
    pub fn with_class(mut self, class: &str) -> Self {
        if let SubjectKind::Principal { class: c, .. } = &mut self.kind {
            *c = class.to_string();
        }
        self
    }

    /// Add a permission to the assign set.
    pub fn grant(mut self, permission: Permission) -> Self {
        self.assign.push(permission);
        self
    }

    /// Add a permission to the revoke set.
    pub fn retract(mut self, permission: Permission) -> Self {
        self.revoke.push(permission);
        self
    }

    /// Entity label used in events and log lines.
    pub fn entity(&self) -> &'static str {
        match self.kind {
            SubjectKind::Principal { .. } => "principal",
            SubjectKind::Codebase => "codebase",
        }
    }

    /// Identity used for duplicate detection and reporting.
    pub fn id(&self) -> SubjectId {
        SubjectId {
            entity: self.entity(),
            name: self.name.clone(),
        }
    }

    /// Whether reconciliation has nothing to do for this subject.
    pub fn is_noop(&self) -> bool {
        self.assign.is_empty() && self.revoke.is_empty()
    }

    /// Check the subject's structural constraints.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PolicyError::InvalidSubject {
                name: "<unnamed>".to_string(),
                reason: "empty name".to_string(),
            });
        }
        match &self.kind {
            SubjectKind::Principal { class, .. } => {
                if class.is_empty() {
                    return Err(PolicyError::InvalidSubject {
                        name: self.name.clone(),
                        reason: "empty identity class".to_string(),
                    });
                }
            }
            SubjectKind::Codebase => {
                if url::Url::parse(&self.name).is_err() {
                    return Err(PolicyError::InvalidSubject {
                        name: self.name.clone(),
                        reason: "codebase location is not a valid URL".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Identity of a subject: entity label plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId {
    pub entity: &'static str,
    pub name: String,
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.entity, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_subject_identity() {
        let subject = Subject::principal("operators", PrincipalKind::Role);
        assert_eq!(subject.entity(), "principal");
        assert_eq!(subject.id().to_string(), "principal operators");
        assert!(subject.is_noop());
        subject.validate().unwrap();
    }

    #[test]
    fn same_name_different_kind_is_distinct() {
        let principal = Subject::principal("app", PrincipalKind::User);
        let codebase = Subject::codebase("app");
        assert_ne!(principal.id(), codebase.id());
    }

    #[test]
    fn codebase_location_must_be_url() {
        Subject::codebase("file:/deploy/app.jar").validate().unwrap();
        Subject::codebase("http://repo/app.jar").validate().unwrap();

        let err = Subject::codebase("/deploy/app.jar").validate().unwrap_err();
        assert!(matches!(err, PolicyError::InvalidSubject { .. }));
    }

    #[test]
    fn empty_name_is_invalid() {
        let subject = Subject::principal("", PrincipalKind::User);
        assert!(subject.validate().is_err());
    }

    #[test]
    fn empty_identity_class_is_invalid() {
        let subject = Subject::principal("ops", PrincipalKind::Role).with_class("");
        assert!(subject.validate().is_err());
    }

    #[test]
    fn permission_display() {
        let read = Permission::new("aegis.io.FilePermission", "/var/log", "read");
        assert_eq!(read.to_string(), "aegis.io.FilePermission(/var/log, read)");

        let all = Permission::new("aegis.security.AllPermission", "", "");
        assert_eq!(all.to_string(), "aegis.security.AllPermission()");
    }

    #[test]
    fn subject_roundtrips_through_json() {
        let subject = Subject::principal("ops", PrincipalKind::Role)
            .grant(Permission::new("aegis.io.FilePermission", "/opt", "read"));
        let json = serde_json::to_string(&subject).unwrap();
        let back: Subject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, subject);
    }
}
