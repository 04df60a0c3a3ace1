//! Error types for the managed-object invocation layer.
//!
//! Every failure coming out of a transport backend is re-expressed in this
//! taxonomy before it reaches a caller, so retry/skip decisions can be made
//! without knowing which backend produced the fault.

use thiserror::Error;

/// Uniform errors for locator and invoker operations.
#[derive(Debug, Error)]
pub enum MgmtError {
    /// The locator found no managed object at the logical name's well-known
    /// coordinates.
    #[error("no managed object resolvable for {name}")]
    NotResolvable {
        /// The logical name that failed to resolve.
        name: String,
    },

    /// The remote registry has no object under the given name.
    #[error("managed object not found: {0}")]
    ObjectNotFound(String),

    /// The object exists but does not expose the requested attribute.
    #[error("attribute {attribute} not found on {object}")]
    AttributeNotFound {
        /// Name of the object the read was issued against.
        object: String,
        /// The missing attribute.
        attribute: String,
    },

    /// Client-side construction error detected before anything was sent.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Transport or remote fault, wrapping the underlying cause.
    #[error("invocation of {operation} failed: {cause}")]
    InvocationFailed {
        /// The operation or attribute the call was for.
        operation: String,
        /// Message of the underlying transport/remote failure.
        cause: String,
    },
}

impl MgmtError {
    /// Check if the error reports an absent object or attribute.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ObjectNotFound(_) | Self::AttributeNotFound { .. }
        )
    }

    /// Check if the error originated in the transport rather than in
    /// request construction or resolution.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::InvocationFailed { .. })
    }
}

/// Result type for invocation-layer operations.
pub type Result<T> = std::result::Result<T, MgmtError>;
