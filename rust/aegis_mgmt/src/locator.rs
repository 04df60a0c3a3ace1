//! Logical-name resolution with a process-scoped, write-once handle cache.
//!
//! Each [`LogicalName`] has a fixed resolution recipe against well-known
//! coordinates. Resolution is a pure function of remote state, so racing
//! resolutions of the same name degrade to redundant work; the first
//! published handle wins and later writes are dropped.

use std::sync::RwLock;

use ahash::AHashMap;

use crate::error::{MgmtError, Result};
use crate::invoker::Invoker;
use crate::name::ObjectName;

/// Registry domain of runtime services.
pub const RUNTIME_DOMAIN: &str = "aegis.runtime";

/// Registry domain of security services.
pub const SECURITY_DOMAIN: &str = "aegis.security";

/// Well-known name of the domain-wide runtime service.
pub const DOMAIN_RUNTIME_NAME: &str = "DomainRuntimeService";

/// Type property of the domain-wide runtime service.
pub const DOMAIN_RUNTIME_TYPE: &str = "RuntimeService";

/// Attribute of the runtime service holding the domain configuration name.
pub const DOMAIN_CONFIGURATION: &str = "DomainConfiguration";

/// Well-known name of the global policy store.
pub const POLICY_STORE_NAME: &str = "GlobalPolicyStore";

/// Stable logical names of the managed objects this layer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalName {
    /// The global policy store holding permission grants.
    PolicyStore,
    /// The domain configuration object.
    DomainConfiguration,
    /// The domain-wide runtime service.
    DomainRuntime,
}

impl std::fmt::Display for LogicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::PolicyStore => "global policy store",
            Self::DomainConfiguration => "domain configuration",
            Self::DomainRuntime => "domain runtime",
        };
        f.write_str(label)
    }
}

/// Write-once cache from logical name to resolved handle.
///
/// Owned by the embedding process and injected into the [`Locator`], so
/// tests can start from an empty cache per run. Readable concurrently once
/// populated.
#[derive(Debug, Default)]
pub struct HandleCache {
    inner: RwLock<AHashMap<LogicalName, ObjectName>>,
}

impl HandleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previously published handle.
    pub fn get(&self, name: LogicalName) -> Option<ObjectName> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&name)
            .cloned()
    }

    /// Publish a resolved handle; the first write for a name wins.
    pub fn publish(&self, name: LogicalName, handle: ObjectName) -> ObjectName {
        let mut map = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(name).or_insert(handle).clone()
    }
}

/// Resolves logical names to registry handles.
pub struct Locator<'a> {
    invoker: &'a Invoker<'a>,
    cache: &'a HandleCache,
}

impl<'a> Locator<'a> {
    /// Create a locator over an invoker and an injectable handle cache.
    pub fn new(invoker: &'a Invoker<'a>, cache: &'a HandleCache) -> Self {
        Self { invoker, cache }
    }

    /// Resolve a logical name, consulting the cache first.
    pub fn resolve(&self, name: LogicalName) -> Result<ObjectName> {
        if let Some(handle) = self.cache.get(name) {
            return Ok(handle);
        }
        let handle = match name {
            LogicalName::PolicyStore => self.resolve_policy_store()?,
            LogicalName::DomainConfiguration => self.resolve_domain_configuration()?,
            LogicalName::DomainRuntime => self.resolve_domain_runtime()?,
        };
        tracing::debug!(logical = %name, handle = %handle, "resolved managed object");
        Ok(self.cache.publish(name, handle))
    }

    /// The policy store lives under a fixed well-known name; resolution
    /// verifies the registry actually carries it.
    fn resolve_policy_store(&self) -> Result<ObjectName> {
        let fixed = ObjectName::new(
            SECURITY_DOMAIN,
            &[("Type", "PolicyStore"), ("Name", POLICY_STORE_NAME)],
        )?;
        let registered = self.invoker.query_names(&fixed.query())?;
        if registered.is_empty() {
            return Err(MgmtError::NotResolvable {
                name: LogicalName::PolicyStore.to_string(),
            });
        }
        Ok(fixed)
    }

    /// The domain runtime is found by a fixed-pattern query that must
    /// return exactly one expected member.
    fn resolve_domain_runtime(&self) -> Result<ObjectName> {
        let pattern = ObjectName::new(
            RUNTIME_DOMAIN,
            &[
                ("Name", DOMAIN_RUNTIME_NAME),
                ("Type", DOMAIN_RUNTIME_TYPE),
            ],
        )?
        .query();
        let mut matches = self.invoker.query_names(&pattern)?;
        if matches.is_empty() {
            return Err(MgmtError::NotResolvable {
                name: LogicalName::DomainRuntime.to_string(),
            });
        }
        Ok(matches.swap_remove(0))
    }

    /// The domain configuration is published as an attribute of the domain
    /// runtime service.
    fn resolve_domain_configuration(&self) -> Result<ObjectName> {
        let runtime = self.resolve(LogicalName::DomainRuntime)?;
        let value = match self.invoker.read_attribute(&runtime, DOMAIN_CONFIGURATION) {
            Ok(value) => value,
            Err(err) if err.is_not_found() => {
                return Err(MgmtError::NotResolvable {
                    name: LogicalName::DomainConfiguration.to_string(),
                })
            }
            Err(err) => return Err(err),
        };
        let name = value.as_str().ok_or_else(|| MgmtError::InvocationFailed {
            operation: DOMAIN_CONFIGURATION.to_string(),
            cause: format!("expected an object name string, got {value}"),
        })?;
        ObjectName::parse(name)
    }
}
