//! Notebook-facing façade over the registry, mapper and connector.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use udp_api_core::{EndpointDeclaration, ParameterDeclaration};

use crate::config::EngineConfig;
use crate::connector::Connector;
use crate::endpoints::EndpointRegistry;
use crate::error::{ConfigError, ConnectError, ParamsError, RegistryError};
use crate::mapping::MappedParameterSet;
use crate::parameter_set::ParameterSet;
use crate::pipeline;
use crate::registry::Registry;
use crate::selection::PendingSelection;
use crate::validation::{validate, ValidationResult};

/// Coarse position in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unselected,
    SetSelected,
    EndpointSelected,
    Mapped,
    Connected,
}

/// Selection state of a manager.
///
/// `Unselected -> SetSelected -> EndpointSelected -> Mapped -> Connected`.
/// Choosing a new set drops back to `SetSelected`.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unselected,
    SetSelected {
        set: Arc<ParameterSet>,
    },
    EndpointSelected {
        set: Arc<ParameterSet>,
        endpoint: Arc<EndpointDeclaration>,
    },
    Mapped {
        set: Arc<ParameterSet>,
        endpoint: Arc<EndpointDeclaration>,
        mapped: Arc<MappedParameterSet>,
    },
    Connected {
        set: Arc<ParameterSet>,
        endpoint: Arc<EndpointDeclaration>,
        mapped: Arc<MappedParameterSet>,
    },
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Unselected => Phase::Unselected,
            SessionState::SetSelected { .. } => Phase::SetSelected,
            SessionState::EndpointSelected { .. } => Phase::EndpointSelected,
            SessionState::Mapped { .. } => Phase::Mapped,
            SessionState::Connected { .. } => Phase::Connected,
        }
    }

    pub fn set(&self) -> Option<&Arc<ParameterSet>> {
        match self {
            SessionState::Unselected => None,
            SessionState::SetSelected { set }
            | SessionState::EndpointSelected { set, .. }
            | SessionState::Mapped { set, .. }
            | SessionState::Connected { set, .. } => Some(set),
        }
    }

    pub fn endpoint(&self) -> Option<&Arc<EndpointDeclaration>> {
        match self {
            SessionState::EndpointSelected { endpoint, .. }
            | SessionState::Mapped { endpoint, .. }
            | SessionState::Connected { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    pub fn mapped(&self) -> Option<&Arc<MappedParameterSet>> {
        match self {
            SessionState::Mapped { mapped, .. } | SessionState::Connected { mapped, .. } => {
                Some(mapped)
            }
            _ => None,
        }
    }
}

/// Listing of what a notebook can pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionsSummary {
    pub algorithm: String,
    /// `(identifier, location_name)` in discovery order.
    pub parameter_sets: Vec<(String, String)>,
    /// `(identifier, url)` of enabled endpoints in identifier order.
    pub endpoints: Vec<(String, String)>,
}

impl fmt::Display for OptionsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Available parameter sets for {}:", self.algorithm)?;
        for (i, (id, location)) in self.parameter_sets.iter().enumerate() {
            writeln!(f, "  {}. {}: {}", i + 1, id, location)?;
        }
        writeln!(f)?;
        writeln!(f, "Available OpenEO endpoints:")?;
        for (i, (id, url)) in self.endpoints.iter().enumerate() {
            writeln!(f, "  {}. {}: {}", i + 1, id, url)?;
        }
        Ok(())
    }
}

type Selection = (Arc<ParameterSet>, Arc<EndpointDeclaration>, Arc<MappedParameterSet>);

pub struct ParameterManager<C> {
    registry: Arc<Registry>,
    endpoints: Arc<EndpointRegistry>,
    connector: Arc<C>,
    state: SessionState,
}

impl<C> ParameterManager<C> {
    pub fn new(registry: Arc<Registry>, endpoints: Arc<EndpointRegistry>, connector: C) -> Self {
        Self::with_shared(registry, endpoints, Arc::new(connector))
    }

    pub fn with_shared(
        registry: Arc<Registry>,
        endpoints: Arc<EndpointRegistry>,
        connector: Arc<C>,
    ) -> Self {
        for (set, endpoint) in registry.dangling_endpoints(&endpoints) {
            warn!("parameter set '{set}' lists unknown endpoint '{endpoint}'");
        }
        Self {
            registry,
            endpoints,
            connector,
            state: SessionState::Unselected,
        }
    }

    /// Manager over the sets of one declaration file, as a notebook uses it.
    pub fn for_declaration_file(
        path: impl AsRef<Path>,
        endpoints: Arc<EndpointRegistry>,
        connector: C,
    ) -> Result<Self, RegistryError> {
        let registry = Registry::load_file(path)?;
        Ok(Self::new(Arc::new(registry), endpoints, connector))
    }

    pub fn from_config(config: &EngineConfig, connector: C) -> Result<Self, ConfigError> {
        let registry = config.load_registry()?;
        let endpoints = config.load_endpoints()?;
        Ok(Self::new(Arc::new(registry), Arc::new(endpoints), connector))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn endpoints(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn current_set(&self) -> Option<&Arc<ParameterSet>> {
        self.state.set()
    }

    pub fn mapped(&self) -> Option<&Arc<MappedParameterSet>> {
        self.state.mapped()
    }

    /// Re-run discovery and drop the current selection.
    pub fn rediscover(&mut self) -> Result<(), RegistryError> {
        let mut registry = Registry::clone(&self.registry);
        registry.rediscover()?;
        self.registry = Arc::new(registry);
        self.state = SessionState::Unselected;
        Ok(())
    }

    pub fn list_parameter_sets(&self) -> Vec<String> {
        self.registry.identifiers()
    }

    /// Named set, else the current set, else the first set.
    pub fn get_parameter_set(
        &self,
        identifier: Option<&str>,
    ) -> Result<Arc<ParameterSet>, ParamsError> {
        match (identifier, self.current_set()) {
            (None, Some(current)) => Ok(Arc::clone(current)),
            (identifier, _) => pipeline::select_set(&self.registry, identifier),
        }
    }

    pub fn use_parameter_set(&mut self, identifier: &str) -> Result<(), ParamsError> {
        let set = pipeline::select_set(&self.registry, Some(identifier))?;
        info!("using parameter set '{}' ({})", set.identifier, set.location_name);
        self.state = SessionState::SetSelected { set };
        Ok(())
    }

    /// Choose the endpoint for the current set, selecting the first set if
    /// none is chosen yet.
    pub fn use_endpoint(&mut self, identifier: &str) -> Result<(), ParamsError> {
        let set = self.get_parameter_set(None)?;
        let endpoint = pipeline::select_endpoint(&self.endpoints, &set, Some(identifier))?;
        self.state = SessionState::EndpointSelected { set, endpoint };
        Ok(())
    }

    pub fn get_parameter(&self, name: &str) -> Result<&ParameterDeclaration, ParamsError> {
        let set = self.current_set().ok_or(ParamsError::NoSetSelected)?;
        set.get(name).ok_or_else(|| ParamsError::UnknownParameter {
            name: name.to_string(),
            set: set.identifier.clone(),
            available: set.names().map(str::to_string).collect(),
        })
    }

    pub fn validate_current(&self) -> Result<ValidationResult, ParamsError> {
        let set = self.current_set().ok_or(ParamsError::NoSetSelected)?;
        Ok(validate(set))
    }

    /// Validate and map the current selection without connecting. Missing
    /// choices fall back to the first set and its first supported endpoint.
    pub fn prepare(&mut self) -> Result<Arc<MappedParameterSet>, ParamsError> {
        self.prepare_selection().map(|(_, _, mapped)| mapped)
    }

    fn prepare_selection(&mut self) -> Result<Selection, ParamsError> {
        let set = self.get_parameter_set(None)?;
        let endpoint = match self.state.endpoint() {
            Some(endpoint) => Arc::clone(endpoint),
            None => pipeline::select_endpoint(&self.endpoints, &set, None)?,
        };
        self.state = SessionState::EndpointSelected {
            set: Arc::clone(&set),
            endpoint: Arc::clone(&endpoint),
        };
        let mapped = Arc::new(pipeline::prepare(&set, &endpoint)?);
        self.state = SessionState::Mapped {
            set: Arc::clone(&set),
            endpoint: Arc::clone(&endpoint),
            mapped: Arc::clone(&mapped),
        };
        Ok((set, endpoint, mapped))
    }

    /// Start an interactive pick over the same registry and connector.
    pub fn interactive_parameter_selection(&self) -> PendingSelection<C> {
        let mut pending = PendingSelection::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.endpoints),
            Arc::clone(&self.connector),
        );
        if let Some(set) = self.current_set() {
            pending.preselect_set(&set.identifier);
        }
        pending
    }

    pub fn options(&self, algorithm: &str) -> OptionsSummary {
        OptionsSummary {
            algorithm: algorithm.to_string(),
            parameter_sets: self
                .registry
                .parameter_sets()
                .iter()
                .map(|s| (s.identifier.clone(), s.location_name.clone()))
                .collect(),
            endpoints: self
                .endpoints
                .enabled()
                .map(|e| (e.identifier.clone(), e.url.clone()))
                .collect(),
        }
    }
}

impl<C: Connector> ParameterManager<C> {
    /// Select, validate, map and connect in one call.
    ///
    /// `None` picks the first set in discovery order and the first endpoint
    /// that set supports, whatever is currently selected. Any selection,
    /// validation or mapping failure returns before the connector is called.
    /// Connector errors come back unchanged.
    pub fn quick_connect(
        &mut self,
        set: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<(C::Connection, MappedParameterSet), ConnectError<C::Error>> {
        let set = pipeline::select_set(&self.registry, set)?;
        let endpoint = pipeline::select_endpoint(&self.endpoints, &set, endpoint)?;
        self.state = SessionState::EndpointSelected { set, endpoint };
        let (set, endpoint, mapped) = self.prepare_selection()?;
        let connection =
            pipeline::connect(self.connector.as_ref(), &endpoint).map_err(ConnectError::Connector)?;
        self.state = SessionState::Connected {
            set,
            endpoint,
            mapped: Arc::clone(&mapped),
        };
        Ok((connection, MappedParameterSet::clone(&mapped)))
    }
}

impl<C> fmt::Display for ParameterManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParameterManager({} sets: {:?}",
            self.registry.len(),
            self.registry.identifiers()
        )?;
        match self.current_set() {
            Some(set) => write!(f, ", current: {})", set.identifier),
            None => write!(f, ", current: none)"),
        }
    }
}

impl<C> fmt::Debug for ParameterManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterManager")
            .field("sets", &self.registry.identifiers())
            .field("endpoints", &self.endpoints.identifiers().collect::<Vec<_>>())
            .field("state", &self.state.phase())
            .finish()
    }
}
