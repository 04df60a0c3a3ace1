//! Object names for the remote management registry.
//!
//! A name is a registry domain plus an ordered list of `key=value`
//! properties, rendered as `domain:key=value,...`. Property order is
//! preserved so the rendered form is deterministic.

use crate::error::{MgmtError, Result};

/// Name of a remotely addressable managed object.
///
/// A name whose `pattern` flag is set matches any object carrying at least
/// the listed properties; registry queries take the pattern form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    domain: String,
    properties: Vec<(String, String)>,
    pattern: bool,
}

impl ObjectName {
    /// Create an exact object name from a domain and key properties.
    pub fn new(domain: &str, properties: &[(&str, &str)]) -> Result<Self> {
        validate_domain(domain)?;
        let mut owned = Vec::with_capacity(properties.len());
        for (key, value) in properties {
            validate_property(key, value)?;
            owned.push(((*key).to_string(), (*value).to_string()));
        }
        Ok(Self {
            domain: domain.to_string(),
            properties: owned,
            pattern: false,
        })
    }

    /// Parse from the `domain:key=value,...` form.
    pub fn parse(s: &str) -> Result<Self> {
        let (domain, rest) = s
            .split_once(':')
            .ok_or_else(|| MgmtError::MalformedRequest(format!("object name without domain: '{s}'")))?;
        validate_domain(domain)?;

        let mut properties = Vec::new();
        let mut pattern = false;
        for part in rest.split(',') {
            if part == "*" {
                pattern = true;
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| {
                MgmtError::MalformedRequest(format!("property without '=' in object name: '{part}'"))
            })?;
            validate_property(key, value)?;
            properties.push((key.to_string(), value.to_string()));
        }
        if properties.is_empty() && !pattern {
            return Err(MgmtError::MalformedRequest(format!(
                "object name without properties: '{s}'"
            )));
        }
        Ok(Self {
            domain: domain.to_string(),
            properties,
            pattern,
        })
    }

    /// Derive the query pattern matching this name's coordinates.
    pub fn query(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            properties: self.properties.clone(),
            pattern: true,
        }
    }

    /// The registry domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Look up a key property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this name is a query pattern rather than an exact name.
    pub fn is_pattern(&self) -> bool {
        self.pattern
    }
}

impl std::fmt::Display for ObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{key}={value}")?;
        }
        if self.pattern {
            if !self.properties.is_empty() {
                write!(f, ",")?;
            }
            write!(f, "*")?;
        }
        Ok(())
    }
}

fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() || domain.contains(':') {
        return Err(MgmtError::MalformedRequest(format!(
            "invalid registry domain: '{domain}'"
        )));
    }
    Ok(())
}

fn validate_property(key: &str, value: &str) -> Result<()> {
    const KEY_FORBIDDEN: &[char] = &[',', '=', ':', '*', '?'];
    const VALUE_FORBIDDEN: &[char] = &[',', '=', ':', '"'];
    if key.is_empty() || key.contains(KEY_FORBIDDEN) {
        return Err(MgmtError::MalformedRequest(format!(
            "invalid property key: '{key}'"
        )));
    }
    if value.contains(VALUE_FORBIDDEN) {
        return Err(MgmtError::MalformedRequest(format!(
            "invalid property value: '{value}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_exact_name() {
        let name = ObjectName::new(
            "aegis.runtime",
            &[("Name", "DomainRuntimeService"), ("Type", "RuntimeService")],
        )
        .unwrap();
        assert_eq!(
            name.to_string(),
            "aegis.runtime:Name=DomainRuntimeService,Type=RuntimeService"
        );

        let parsed = ObjectName::parse(&name.to_string()).unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.property("Name"), Some("DomainRuntimeService"));
        assert_eq!(parsed.property("Missing"), None);
    }

    #[test]
    fn query_appends_wildcard() {
        let name = ObjectName::new("aegis.security", &[("Type", "PolicyStore")]).unwrap();
        let query = name.query();
        assert!(query.is_pattern());
        assert_eq!(query.to_string(), "aegis.security:Type=PolicyStore,*");

        let parsed = ObjectName::parse(&query.to_string()).unwrap();
        assert!(parsed.is_pattern());
        assert_eq!(parsed, query);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(ObjectName::parse("no-domain-separator").is_err());
        assert!(ObjectName::parse("aegis.runtime:").is_err());
        assert!(ObjectName::parse("aegis.runtime:NameOnly").is_err());
        assert!(matches!(
            ObjectName::parse("aegis.runtime:Na*me=x"),
            Err(MgmtError::MalformedRequest(_))
        ));
    }

    #[test]
    fn new_rejects_forbidden_characters() {
        assert!(ObjectName::new("", &[("Name", "x")]).is_err());
        assert!(ObjectName::new("a:b", &[("Name", "x")]).is_err());
        assert!(ObjectName::new("aegis", &[("Na,me", "x")]).is_err());
        assert!(ObjectName::new("aegis", &[("Name", "x\"y")]).is_err());
    }

    #[test]
    fn property_order_is_preserved() {
        let name = ObjectName::new("aegis", &[("b", "2"), ("a", "1")]).unwrap();
        assert_eq!(name.to_string(), "aegis:b=2,a=1");
    }
}
