//! Error taxonomy for discovery, lookup, validation, mapping and connection.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use udp_api_core::{DeclarationParseError, ParameterKind};

use crate::validation::ValidationResult;

/// What kind of identifier a failed lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    Set,
    Endpoint,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Set => f.write_str("parameter set"),
            LookupKind::Endpoint => f.write_str("endpoint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} '{identifier}' not found. Available: {available:?}")]
pub struct NotFoundError {
    pub kind: LookupKind,
    pub identifier: String,
    pub available: Vec<String>,
}

impl NotFoundError {
    pub fn set(identifier: impl Into<String>, available: Vec<String>) -> Self {
        Self {
            kind: LookupKind::Set,
            identifier: identifier.into(),
            available,
        }
    }

    pub fn endpoint(identifier: impl Into<String>, available: Vec<String>) -> Self {
        Self {
            kind: LookupKind::Endpoint,
            identifier: identifier.into(),
            available,
        }
    }
}

/// Structural problems with one parameter set body.
#[derive(Debug, Error)]
pub enum SetError {
    #[error("parameter set '{set}' is missing required field '{field}'")]
    MissingField { set: String, field: &'static str },
    #[error("parameter set '{set}': '{parameter}' must be of kind {expected}, found {found}")]
    WrongKind {
        set: String,
        parameter: String,
        expected: &'static str,
        found: ParameterKind,
    },
    #[error("parameter set '{set}': {source}")]
    Parameter {
        set: String,
        #[source]
        source: DeclarationParseError,
    },
    #[error("parameter set '{set}': {source}")]
    Body {
        set: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to load one declaration file. Discovery logs and skips these.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} declares no parameter sets", path.display())]
    Empty { path: PathBuf },
    #[error("{}: {source}", path.display())]
    Set {
        path: PathBuf,
        #[source]
        source: SetError,
    },
}

impl DeclarationError {
    pub fn path(&self) -> &Path {
        match self {
            DeclarationError::Io { path, .. }
            | DeclarationError::Parse { path, .. }
            | DeclarationError::Empty { path }
            | DeclarationError::Set { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("declaration root {} does not exist or is not a directory", path.display())]
    RootNotFound { path: PathBuf },
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}

/// Errors loading endpoint registries and engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("endpoint '{identifier}': {reason}")]
    InvalidEndpoint { identifier: String, reason: String },
    #[error("endpoint '{identifier}' declared more than once")]
    DuplicateEndpoint { identifier: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    #[error("endpoint '{endpoint}' is not supported by parameter set '{set}'")]
    UnsupportedEndpoint { set: String, endpoint: String },
    #[error("endpoint '{endpoint}' lacks processes required by parameter set '{set}': {missing:?}")]
    MissingCapabilities {
        set: String,
        endpoint: String,
        missing: Vec<String>,
    },
    #[error("parameter set '{set}' has no '{parameter}' declaration to map")]
    MissingDeclaration { set: String, parameter: &'static str },
    #[error("'{parameter}' in parameter set '{set}' must be {expected}")]
    InvalidDeclaration {
        set: String,
        parameter: &'static str,
        expected: &'static str,
    },
    #[error("bands '{first}' and '{second}' both map to '{token}' on endpoint '{endpoint}'")]
    DuplicateBand {
        endpoint: String,
        first: String,
        second: String,
        token: String,
    },
    #[error("mapping '{set}' to '{endpoint}' produced an invalid set: {result}")]
    InvalidResult {
        set: String,
        endpoint: String,
        result: ValidationResult,
    },
    #[error("parameter set '{set}' supports no enabled endpoint")]
    NoEndpointAvailable { set: String },
}

/// Errors surfaced by the parameter manager and the selection pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("{0}")]
    Validation(ValidationResult),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("parameter '{name}' not found in set '{set}'. Available: {available:?}")]
    UnknownParameter {
        name: String,
        set: String,
        available: Vec<String>,
    },
    #[error("no parameter set selected")]
    NoSetSelected,
    #[error("no parameter sets available")]
    NoParameterSets,
}

impl ParamsError {
    pub fn validation_result(&self) -> Option<&ValidationResult> {
        match self {
            ParamsError::Validation(result) => Some(result),
            _ => None,
        }
    }
}

/// Result of a connect attempt: either the engine refused (nothing was sent
/// to the connector) or the connector itself failed. Connector errors are
/// carried as-is.
#[derive(Debug, Error)]
pub enum ConnectError<E> {
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Connector(E),
}

impl<E> ConnectError<E> {
    pub fn params(&self) -> Option<&ParamsError> {
        match self {
            ConnectError::Params(err) => Some(err),
            ConnectError::Connector(_) => None,
        }
    }

    pub fn connector(&self) -> Option<&E> {
        match self {
            ConnectError::Connector(err) => Some(err),
            ConnectError::Params(_) => None,
        }
    }

    pub fn into_connector(self) -> Option<E> {
        match self {
            ConnectError::Connector(err) => Some(err),
            ConnectError::Params(_) => None,
        }
    }
}
