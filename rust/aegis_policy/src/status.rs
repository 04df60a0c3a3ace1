//! Read-only server-lifecycle status fan-out.
//!
//! Resolves the domain runtime, reads its lifecycle-runtime array and
//! reports `Name`/`State` per configured server. No mutation.

use serde::Serialize;

use aegis_mgmt::{Invoker, Locator, LogicalName, MgmtError, ObjectName};

use crate::error::Result;
use crate::event::{Event, EventSink};

/// Attribute of the domain runtime holding the lifecycle object array.
pub const LIFECYCLE_RUNTIMES: &str = "ServerLifecycleRuntimes";

const ATTR_NAME: &str = "Name";
const ATTR_STATE: &str = "State";

/// Lifecycle state of one configured server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    pub name: String,
    pub state: String,
}

/// Report the lifecycle state of every configured server in the domain.
pub fn server_status(
    locator: &Locator<'_>,
    invoker: &Invoker<'_>,
    sink: &dyn EventSink,
) -> Result<Vec<ServerStatus>> {
    let runtime = locator.resolve(LogicalName::DomainRuntime)?;
    let reply = invoker.read_attribute(&runtime, LIFECYCLE_RUNTIMES)?;
    let children = reply.as_array().ok_or_else(|| MgmtError::InvocationFailed {
        operation: LIFECYCLE_RUNTIMES.to_string(),
        cause: format!("expected an object-name array, got {reply}"),
    })?;

    let mut statuses = Vec::with_capacity(children.len());
    for child in children {
        let raw = child.as_str().ok_or_else(|| MgmtError::InvocationFailed {
            operation: LIFECYCLE_RUNTIMES.to_string(),
            cause: format!("expected an object name string, got {child}"),
        })?;
        let lifecycle = ObjectName::parse(raw)?;
        let name = read_string(invoker, &lifecycle, ATTR_NAME)?;
        let state = read_string(invoker, &lifecycle, ATTR_STATE)?;
        sink.emit(Event::observed("server", &name, &state));
        statuses.push(ServerStatus { name, state });
    }
    Ok(statuses)
}

fn read_string(invoker: &Invoker<'_>, object: &ObjectName, attribute: &str) -> Result<String> {
    let value = invoker.read_attribute(object, attribute)?;
    let text = value.as_str().ok_or_else(|| MgmtError::InvocationFailed {
        operation: attribute.to_string(),
        cause: format!("expected a string, got {value}"),
    })?;
    Ok(text.to_string())
}
