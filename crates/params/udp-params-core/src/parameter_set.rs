//! Named parameter sets: one geographic case study of one algorithm.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use udp_api_core::{ParameterDeclaration, ParameterKind};

use crate::error::SetError;

/// Declaration every set must carry; rewritten per endpoint.
pub const COLLECTION: &str = "collection";
/// Band list of image-based sets; rewritten per endpoint.
pub const BANDS: &str = "bands";

fn default_image_based() -> bool {
    true
}

/// Set body as written in a declaration file, before parameter entries are parsed.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawParameterSet {
    #[serde(default)]
    location_name: Option<String>,
    #[serde(default)]
    supported_endpoints: Vec<String>,
    #[serde(default = "default_image_based")]
    image_based: bool,
    #[serde(default)]
    required_capabilities: Vec<String>,
    #[serde(default)]
    parameters: IndexMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    pub identifier: String,
    /// Algorithm the set belongs to; the declaration file stem.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub algorithm: String,
    pub location_name: String,
    pub parameters: IndexMap<String, ParameterDeclaration>,
    pub supported_endpoints: BTreeSet<String>,
    pub image_based: bool,
    /// openEO processes an endpoint must offer to run this set.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub required_capabilities: BTreeSet<String>,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl ParameterSet {
    pub fn new(identifier: impl Into<String>, location_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            algorithm: String::new(),
            location_name: location_name.into(),
            parameters: IndexMap::new(),
            supported_endpoints: BTreeSet::new(),
            image_based: true,
            required_capabilities: BTreeSet::new(),
            source: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Add or replace a declaration. A replaced entry keeps its position.
    pub fn with_parameter(mut self, declaration: ParameterDeclaration) -> Self {
        self.parameters.insert(declaration.name.clone(), declaration);
        self
    }

    pub fn with_supported_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image_based(mut self, image_based: bool) -> Self {
        self.image_based = image_based;
        self
    }

    pub fn with_required_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Parse one set body from a declaration file.
    pub fn from_json(
        identifier: &str,
        algorithm: &str,
        body: &JsonValue,
    ) -> Result<Self, SetError> {
        let raw: RawParameterSet =
            serde_json::from_value(body.clone()).map_err(|source| SetError::Body {
                set: identifier.to_string(),
                source,
            })?;
        Self::from_raw(identifier, algorithm, raw)
    }

    pub(crate) fn from_raw(
        identifier: &str,
        algorithm: &str,
        raw: RawParameterSet,
    ) -> Result<Self, SetError> {
        let mut parameters = IndexMap::with_capacity(raw.parameters.len());
        for (name, entry) in &raw.parameters {
            let decl = ParameterDeclaration::from_json(name, entry).map_err(|source| {
                SetError::Parameter {
                    set: identifier.to_string(),
                    source,
                }
            })?;
            parameters.insert(name.clone(), decl);
        }
        Ok(Self {
            identifier: identifier.to_string(),
            algorithm: algorithm.to_string(),
            location_name: raw.location_name.unwrap_or_default(),
            parameters,
            supported_endpoints: raw.supported_endpoints.into_iter().collect(),
            image_based: raw.image_based,
            required_capabilities: raw.required_capabilities.into_iter().collect(),
            source: None,
        })
    }

    /// Check the fields every loadable set must carry.
    pub fn check_required(&self) -> Result<(), SetError> {
        if self.location_name.trim().is_empty() {
            return Err(self.missing("location_name"));
        }
        let collection = self.get(COLLECTION).ok_or_else(|| self.missing(COLLECTION))?;
        if !matches!(collection.kind(), ParameterKind::String | ParameterKind::Enum) {
            return Err(SetError::WrongKind {
                set: self.identifier.clone(),
                parameter: COLLECTION.to_string(),
                expected: "string or enum",
                found: collection.kind(),
            });
        }
        if self.image_based {
            let bands = self.get(BANDS).ok_or_else(|| self.missing(BANDS))?;
            if bands.kind() != ParameterKind::BandList {
                return Err(SetError::WrongKind {
                    set: self.identifier.clone(),
                    parameter: BANDS.to_string(),
                    expected: ParameterKind::BandList.as_str(),
                    found: bands.kind(),
                });
            }
        }
        Ok(())
    }

    fn missing(&self, field: &'static str) -> SetError {
        SetError::MissingField {
            set: self.identifier.clone(),
            field,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDeclaration> {
        self.parameters.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn supports(&self, endpoint: &str) -> bool {
        self.supported_endpoints.contains(endpoint)
    }

    pub fn collection(&self) -> Option<&str> {
        self.get(COLLECTION)?.default_str()
    }

    pub fn bands(&self) -> Option<Vec<&str>> {
        self.get(BANDS)?.default_strings()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
