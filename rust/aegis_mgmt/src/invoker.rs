//! Attribute reads and operation invokes with uniform fault translation.

use serde_json::Value;

use crate::error::{MgmtError, Result};
use crate::name::ObjectName;
use crate::transport::{Transport, TransportFault};

/// Issues calls against resolved managed objects.
///
/// This is the single point where [`TransportFault`]s are re-expressed as
/// [`MgmtError`]s; nothing transport-specific leaks past it.
pub struct Invoker<'t> {
    transport: &'t dyn Transport,
}

impl<'t> Invoker<'t> {
    /// Create an invoker over a transport backend.
    pub fn new(transport: &'t dyn Transport) -> Self {
        Self { transport }
    }

    /// Read a named attribute of a managed object.
    pub fn read_attribute(&self, object: &ObjectName, attribute: &str) -> Result<Value> {
        tracing::debug!(object = %object, attribute, "reading attribute");
        self.transport
            .read_attribute(object, attribute)
            .map_err(|fault| translate(fault, attribute))
    }

    /// Invoke a named operation on a managed object.
    pub fn invoke(
        &self,
        object: &ObjectName,
        operation: &str,
        parameter: &[Value],
        signature: &[&str],
    ) -> Result<Value> {
        tracing::debug!(object = %object, operation, parameters = parameter.len(), "invoking operation");
        self.transport
            .invoke(object, operation, parameter, signature)
            .map_err(|fault| translate(fault, operation))
    }

    /// Return the names of registered objects matching a pattern.
    pub fn query_names(&self, pattern: &ObjectName) -> Result<Vec<ObjectName>> {
        tracing::debug!(pattern = %pattern, "querying object names");
        self.transport
            .query_names(pattern)
            .map_err(|fault| translate(fault, "queryNames"))
    }
}

fn translate(fault: TransportFault, operation: &str) -> MgmtError {
    match fault {
        TransportFault::ObjectNotFound(object) => MgmtError::ObjectNotFound(object),
        TransportFault::AttributeNotFound { object, attribute } => {
            MgmtError::AttributeNotFound { object, attribute }
        }
        TransportFault::Other(cause) => MgmtError::InvocationFailed {
            operation: operation.to_string(),
            cause,
        },
    }
}
