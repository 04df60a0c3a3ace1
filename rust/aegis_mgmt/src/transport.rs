//! The transport seam of the invocation layer.
//!
//! A [`Transport`] is one blocking round trip per call against the remote
//! management endpoint. Backends report failures as [`TransportFault`]s; the
//! [`crate::Invoker`] is the only place faults are translated into the
//! public [`crate::MgmtError`] taxonomy.

use serde_json::Value;
use thiserror::Error;

use crate::name::ObjectName;

/// Protocol type tags used in operation signatures.
///
/// Every invoke carries one tag per parameter so the endpoint can select
/// among overloaded operations.
pub mod sig {
    pub const STRING: &str = "string";
    pub const BOOLEAN: &str = "boolean";
    pub const INT: &str = "int";
    /// A single composite (structured) value.
    pub const COMPOSITE: &str = "composite";
    /// An array of composite values, e.g. a grant batch.
    pub const COMPOSITE_ARRAY: &str = "composite[]";
}

/// Raw failure surface reported by a transport backend.
#[derive(Debug, Error)]
pub enum TransportFault {
    /// The registry has no object under the given name.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The object exists but the attribute does not.
    #[error("attribute {attribute} not found on {object}")]
    AttributeNotFound {
        object: String,
        attribute: String,
    },

    /// Any other transport or remote fault.
    #[error("{0}")]
    Other(String),
}

/// Blocking transport to a remote management endpoint.
///
/// Calls do not overlap; the caller issues one round trip, awaits the
/// result, then issues the next. Implementations use interior mutability
/// where they keep connection state.
pub trait Transport {
    /// Read a named attribute of a managed object.
    fn read_attribute(
        &self,
        object: &ObjectName,
        attribute: &str,
    ) -> std::result::Result<Value, TransportFault>;

    /// Invoke a named operation with positional parameters and their
    /// signature type tags.
    fn invoke(
        &self,
        object: &ObjectName,
        operation: &str,
        parameter: &[Value],
        signature: &[&str],
    ) -> std::result::Result<Value, TransportFault>;

    /// Return the names of registered objects matching a pattern.
    fn query_names(
        &self,
        pattern: &ObjectName,
    ) -> std::result::Result<Vec<ObjectName>, TransportFault>;
}
