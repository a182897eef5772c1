//! udp-params: parameter set registry and endpoint mapping for openEO UDP notebooks.
//!
//! Declaration files (`*.params.json`) are discovered into a [`Registry`].
//! A [`ParameterManager`] lets a notebook pick a set and a backend, checks the
//! set with [`validate`], rewrites it for the backend with [`apply_mapping`]
//! and finally hands url and auth method to a [`Connector`].

pub mod config;
pub mod connector;
pub mod endpoints;
pub mod error;
pub mod manager;
pub mod mapping;
pub mod parameter_set;
pub mod pipeline;
pub mod registry;
pub mod selection;
pub mod validation;

pub use config::{DiscoveryConfig, EngineConfig};
pub use connector::Connector;
pub use endpoints::EndpointRegistry;
pub use error::{
    ConfigError, ConnectError, DeclarationError, LookupKind, MappingError, NotFoundError,
    ParamsError, RegistryError, SetError,
};
pub use manager::{OptionsSummary, ParameterManager, Phase, SessionState};
pub use mapping::{apply_mapping, MappedParameterSet, ParameterChange};
pub use parameter_set::{ParameterSet, BANDS, COLLECTION};
pub use registry::{load_declaration_file, Registry, SkippedDeclaration};
pub use selection::{PendingSelection, SelectionOption};
pub use validation::{
    validate, validate_for_endpoint, validate_value, Constraint, ValidationResult, Violation,
};

pub use udp_api_core::{
    AuthMethod, BandCase, BandFamily, BandFormat, BoundingBox, Constraints, EndpointDeclaration,
    ParameterDeclaration, ParameterKind, TemporalExtent,
};
