//! Interactive selection for notebook UIs.
//!
//! A UI adapter lists the options, forwards the user's picks, and calls
//! [`PendingSelection::finish`] when the user confirms. Nothing here renders
//! widgets.

use std::sync::Arc;

use serde::Serialize;

use crate::connector::Connector;
use crate::endpoints::EndpointRegistry;
use crate::error::{ConnectError, ParamsError};
use crate::mapping::MappedParameterSet;
use crate::pipeline;
use crate::registry::Registry;

/// One entry of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionOption {
    pub identifier: String,
    pub label: String,
}

pub struct PendingSelection<C> {
    registry: Arc<Registry>,
    endpoints: Arc<EndpointRegistry>,
    connector: Arc<C>,
    set: Option<String>,
    endpoint: Option<String>,
}

impl<C> PendingSelection<C> {
    pub fn new(
        registry: Arc<Registry>,
        endpoints: Arc<EndpointRegistry>,
        connector: Arc<C>,
    ) -> Self {
        Self {
            registry,
            endpoints,
            connector,
            set: None,
            endpoint: None,
        }
    }

    pub(crate) fn preselect_set(&mut self, identifier: &str) {
        self.set = Some(identifier.to_string());
    }

    /// `identifier: location_name` for every set, in discovery order.
    pub fn parameter_set_options(&self) -> Vec<SelectionOption> {
        self.registry
            .parameter_sets()
            .iter()
            .map(|s| SelectionOption {
                identifier: s.identifier.clone(),
                label: format!("{}: {}", s.identifier, s.location_name),
            })
            .collect()
    }

    /// Enabled endpoints the selected set supports, or every enabled
    /// endpoint while no set is selected.
    pub fn endpoint_options(&self) -> Vec<SelectionOption> {
        let set = self.set.as_deref().and_then(|id| self.registry.get(id));
        self.endpoints
            .enabled()
            .filter(|e| {
                set.map_or(true, |s| {
                    s.supports(&e.identifier)
                        && e.missing_capabilities(&s.required_capabilities).is_empty()
                })
            })
            .map(|e| SelectionOption {
                identifier: e.identifier.clone(),
                label: format!("{}: {}", e.identifier, e.url),
            })
            .collect()
    }

    pub fn select_parameter_set(&mut self, identifier: &str) -> Result<&mut Self, ParamsError> {
        self.registry.require(identifier)?;
        self.set = Some(identifier.to_string());
        Ok(self)
    }

    pub fn select_endpoint(&mut self, identifier: &str) -> Result<&mut Self, ParamsError> {
        self.endpoints.require(identifier)?;
        self.endpoint = Some(identifier.to_string());
        Ok(self)
    }

    pub fn selected_set(&self) -> Option<&str> {
        self.set.as_deref()
    }

    pub fn selected_endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

impl<C: Connector> PendingSelection<C> {
    /// Run the pipeline on the current picks. Unpicked values use the same
    /// defaults as `quick_connect`.
    pub fn finish(self) -> Result<(C::Connection, MappedParameterSet), ConnectError<C::Error>> {
        pipeline::run(
            &self.registry,
            &self.endpoints,
            self.connector.as_ref(),
            self.set.as_deref(),
            self.endpoint.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_set::ParameterSet;
    use serde_json::json;
    use udp_api_core::{AuthMethod, BandFamily, Constraints, ParameterDeclaration};

    fn pending() -> PendingSelection<fn(&str, AuthMethod) -> Result<String, String>> {
        fn dial(url: &str, _: AuthMethod) -> Result<String, String> {
            Ok(url.to_string())
        }
        let set = ParameterSet::new("gran_canaria", "Gran Canaria, Spain")
            .with_supported_endpoints(["ds_development"])
            .with_parameter(ParameterDeclaration::new(
                "collection",
                Constraints::String,
                json!("sentinel-2-l2a"),
            ))
            .with_parameter(ParameterDeclaration::new(
                "bands",
                Constraints::band_list(BandFamily::Sentinel2),
                json!(["B04", "B8A", "B12"]),
            ));
        PendingSelection::new(
            Arc::new(Registry::from_sets([set])),
            Arc::new(EndpointRegistry::bundled().unwrap()),
            Arc::new(dial as fn(&str, AuthMethod) -> Result<String, String>),
        )
    }

    #[test]
    fn lists_options_and_narrows_endpoints() {
        let mut pending = pending();
        assert_eq!(
            pending.parameter_set_options()[0].label,
            "gran_canaria: Gran Canaria, Spain"
        );
        assert_eq!(pending.endpoint_options().len(), 4);
        pending.select_parameter_set("gran_canaria").unwrap();
        assert_eq!(
            pending.endpoint_options(),
            [SelectionOption {
                identifier: "ds_development".into(),
                label: "ds_development: https://openeo.ds.io/".into(),
            }]
        );
    }

    #[test]
    fn endpoints_missing_required_processes_are_not_offered() {
        let set = ParameterSet::new("batch", "Somewhere")
            .with_supported_endpoints(["copernicus_dataspace", "ds_development"])
            .with_required_capabilities(["batch_processing"]);
        let mut pending = PendingSelection::new(
            Arc::new(Registry::from_sets([set])),
            Arc::new(EndpointRegistry::bundled().unwrap()),
            Arc::new(|url: &str, _: AuthMethod| Ok::<_, String>(url.to_string())),
        );
        pending.select_parameter_set("batch").unwrap();
        let ids: Vec<String> = pending
            .endpoint_options()
            .into_iter()
            .map(|o| o.identifier)
            .collect();
        assert_eq!(ids, ["copernicus_dataspace"]);
    }

    #[test]
    fn finish_runs_the_pipeline() {
        let mut pending = pending();
        assert!(pending.select_parameter_set("atlantis").is_err());
        pending
            .select_parameter_set("gran_canaria")
            .unwrap()
            .select_endpoint("ds_development")
            .unwrap();
        let (conn, mapped) = pending.finish().unwrap();
        assert_eq!(conn, "https://openeo.ds.io/");
        assert_eq!(mapped.endpoint_identifier, "ds_development");
    }

    #[test]
    fn finish_refuses_unsupported_endpoint() {
        let mut pending = pending();
        pending.select_endpoint("copernicus_explorer").unwrap();
        let err = pending.finish().unwrap_err();
        assert!(matches!(
            err.params(),
            Some(ParamsError::Mapping(crate::MappingError::UnsupportedEndpoint { .. }))
        ));
    }
}
