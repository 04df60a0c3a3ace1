//! `aegis_mgmt` — managed-object invocation layer for Aegis.
//!
//! Talks to a remote management endpoint that exposes named, typed objects
//! with readable attributes and invokable operations. Everything above this
//! crate works in terms of [`ObjectName`] handles and the uniform
//! [`MgmtError`] taxonomy; no transport-native error type crosses this
//! boundary.
//!
//! Modules:
//! - `name`      — object names (registry domain + key properties)
//! - `error`     — uniform error taxonomy
//! - `transport` — the blocking transport seam and signature type tags
//! - `invoker`   — attribute read / operation invoke with fault translation
//! - `locator`   — logical-name resolution with a write-once handle cache
//! - `grpc`      — tonic transport backend (feature `grpc`)

pub mod error;
#[cfg(feature = "grpc")]
pub mod grpc;
pub mod invoker;
pub mod locator;
pub mod name;
pub mod transport;

pub use error::{MgmtError, Result};
pub use invoker::Invoker;
pub use locator::{HandleCache, Locator, LogicalName};
pub use name::ObjectName;
pub use transport::{sig, Transport, TransportFault};
