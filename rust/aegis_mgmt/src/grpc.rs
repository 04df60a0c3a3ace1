//! gRPC transport backend for the management protocol.
//!
//! Built on [tonic](https://github.com/hyperium/tonic). The adapter owns a
//! current-thread tokio runtime and blocks on each call, matching the
//! one-round-trip-at-a-time model of [`Transport`].
//!
//! Fault mapping: the endpoint reports absent objects and attributes as
//! `NOT_FOUND` with an `object-not-found:` / `attribute-not-found:` message
//! prefix; every other status becomes [`TransportFault::Other`].

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tonic::transport::{Channel, Endpoint};

use crate::error::{MgmtError, Result};
use crate::name::ObjectName;
use crate::transport::{Transport, TransportFault};

use proto::management_service_client::ManagementServiceClient;
use proto::{InvokeRequest, QueryNamesRequest, ReadAttributeRequest};

/// Generated protobuf types for the management service.
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/aegis.mgmt.rs"));
}

const OBJECT_NOT_FOUND_PREFIX: &str = "object-not-found:";
const ATTRIBUTE_NOT_FOUND_PREFIX: &str = "attribute-not-found:";

/// Configuration for the management client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking gRPC client for a remote management endpoint.
pub struct GrpcTransport {
    endpoint: String,
    runtime: tokio::runtime::Runtime,
    client: Mutex<ManagementServiceClient<Channel>>,
}

impl GrpcTransport {
    /// Connect to a management endpoint.
    pub fn connect(endpoint: &str, config: ClientConfig) -> Result<Self> {
        tracing::info!("connecting to management endpoint at {}", endpoint);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MgmtError::InvocationFailed {
                operation: "connect".to_string(),
                cause: e.to_string(),
            })?;

        let channel = runtime.block_on(async {
            Endpoint::from_shared(endpoint.to_string())
                .map_err(|e| MgmtError::MalformedRequest(e.to_string()))?
                .connect_timeout(config.connect_timeout)
                .timeout(config.request_timeout)
                .connect()
                .await
                .map_err(|e| MgmtError::InvocationFailed {
                    operation: "connect".to_string(),
                    cause: e.to_string(),
                })
        })?;

        tracing::info!("connected to management endpoint at {}", endpoint);

        Ok(Self {
            endpoint: endpoint.to_string(),
            runtime,
            client: Mutex::new(ManagementServiceClient::new(channel)),
        })
    }

    /// The endpoint this client is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> std::sync::MutexGuard<'_, ManagementServiceClient<Channel>> {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for GrpcTransport {
    fn read_attribute(
        &self,
        object: &ObjectName,
        attribute: &str,
    ) -> std::result::Result<Value, TransportFault> {
        let request = tonic::Request::new(ReadAttributeRequest {
            object_name: object.to_string(),
            attribute: attribute.to_string(),
        });
        let response = self
            .runtime
            .block_on(self.client().read_attribute(request))
            .map_err(translate_status)?;
        decode_value(&response.into_inner().value_json)
    }

    fn invoke(
        &self,
        object: &ObjectName,
        operation: &str,
        parameter: &[Value],
        signature: &[&str],
    ) -> std::result::Result<Value, TransportFault> {
        let request = tonic::Request::new(InvokeRequest {
            object_name: object.to_string(),
            operation: operation.to_string(),
            parameter_json: parameter.iter().map(Value::to_string).collect(),
            signature: signature.iter().map(|s| (*s).to_string()).collect(),
        });
        let response = self
            .runtime
            .block_on(self.client().invoke(request))
            .map_err(translate_status)?;
        decode_value(&response.into_inner().value_json)
    }

    fn query_names(
        &self,
        pattern: &ObjectName,
    ) -> std::result::Result<Vec<ObjectName>, TransportFault> {
        let request = tonic::Request::new(QueryNamesRequest {
            pattern: pattern.to_string(),
        });
        let response = self
            .runtime
            .block_on(self.client().query_names(request))
            .map_err(translate_status)?;
        response
            .into_inner()
            .object_name
            .iter()
            .map(|name| {
                ObjectName::parse(name)
                    .map_err(|e| TransportFault::Other(format!("unparseable name in reply: {e}")))
            })
            .collect()
    }
}

fn translate_status(status: tonic::Status) -> TransportFault {
    let message = status.message().to_string();
    if status.code() == tonic::Code::NotFound {
        if let Some(rest) = message.strip_prefix(ATTRIBUTE_NOT_FOUND_PREFIX) {
            let (object, attribute) = rest
                .trim()
                .split_once('#')
                .unwrap_or((rest.trim(), ""));
            return TransportFault::AttributeNotFound {
                object: object.to_string(),
                attribute: attribute.to_string(),
            };
        }
        if let Some(rest) = message.strip_prefix(OBJECT_NOT_FOUND_PREFIX) {
            return TransportFault::ObjectNotFound(rest.trim().to_string());
        }
        return TransportFault::ObjectNotFound(message);
    }
    TransportFault::Other(message)
}

fn decode_value(raw: &str) -> std::result::Result<Value, TransportFault> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw)
        .map_err(|e| TransportFault::Other(format!("unparseable value in reply: {e}")))
}
