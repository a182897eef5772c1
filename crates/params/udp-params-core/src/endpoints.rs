//! Endpoint registry: every known backend keyed by identifier.
//!
//! Built explicitly (from a file, a JSON string, or the bundled copy) and
//! shared read-only through `Arc`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use udp_api_core::EndpointDeclaration;

use crate::error::{ConfigError, NotFoundError};
use crate::parameter_set::ParameterSet;

const BUNDLED_ENDPOINTS: &str = include_str!("../data/endpoints.json");

#[derive(Debug, Deserialize)]
struct EndpointFile {
    endpoints: BTreeMap<String, EndpointDeclaration>,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, Arc<EndpointDeclaration>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backends the notebooks ship with.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::parse(BUNDLED_ENDPOINTS, "bundled endpoints")
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "endpoint registry")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, what: &str) -> Result<Self, ConfigError> {
        let file: EndpointFile = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            what: what.to_string(),
            source,
        })?;
        let mut registry = Self::new();
        for (key, mut endpoint) in file.endpoints {
            if endpoint.identifier.is_empty() {
                endpoint.identifier = key.clone();
            } else if endpoint.identifier != key {
                return Err(ConfigError::InvalidEndpoint {
                    identifier: key,
                    reason: format!("entry declares identifier '{}'", endpoint.identifier),
                });
            }
            registry.insert(endpoint)?;
        }
        Ok(registry)
    }

    pub fn from_declarations<I>(endpoints: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = EndpointDeclaration>,
    {
        let mut registry = Self::new();
        for endpoint in endpoints {
            registry.insert(endpoint)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, mut endpoint: EndpointDeclaration) -> Result<(), ConfigError> {
        if endpoint.identifier.trim().is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                identifier: endpoint.identifier,
                reason: "identifier must not be empty".into(),
            });
        }
        if endpoint.url.trim().is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                identifier: endpoint.identifier,
                reason: "url must not be empty".into(),
            });
        }
        if self.endpoints.contains_key(&endpoint.identifier) {
            return Err(ConfigError::DuplicateEndpoint {
                identifier: endpoint.identifier,
            });
        }
        if endpoint.name.is_empty() {
            endpoint.name = endpoint.identifier.clone();
        }
        self.endpoints
            .insert(endpoint.identifier.clone(), Arc::new(endpoint));
        Ok(())
    }

    /// Look up an endpoint regardless of whether it is enabled.
    pub fn get(&self, identifier: &str) -> Option<&Arc<EndpointDeclaration>> {
        self.endpoints.get(identifier)
    }

    /// Look up an endpoint that may be used. Disabled endpoints are not found.
    pub fn require(&self, identifier: &str) -> Result<&Arc<EndpointDeclaration>, NotFoundError> {
        match self.endpoints.get(identifier) {
            Some(endpoint) if endpoint.enabled => Ok(endpoint),
            _ => Err(NotFoundError::endpoint(
                identifier,
                self.enabled().map(|e| e.identifier.clone()).collect(),
            )),
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.endpoints.contains_key(identifier)
    }

    /// All identifiers, enabled or not, in identifier order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EndpointDeclaration>> {
        self.endpoints.values()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<EndpointDeclaration>> {
        self.endpoints.values().filter(|e| e.enabled)
    }

    /// First enabled endpoint, in identifier order, that `set` supports and
    /// that offers every process the set requires.
    pub fn first_supported(&self, set: &ParameterSet) -> Option<&Arc<EndpointDeclaration>> {
        self.enabled().find(|e| {
            set.supports(&e.identifier)
                && e.missing_capabilities(&set.required_capabilities).is_empty()
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
