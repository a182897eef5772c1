//! Select, validate, map, connect.
//!
//! Shared by [`ParameterManager::quick_connect`](crate::ParameterManager::quick_connect)
//! and [`PendingSelection::finish`](crate::PendingSelection::finish).

use std::sync::Arc;

use log::{debug, info};

use udp_api_core::EndpointDeclaration;

use crate::connector::Connector;
use crate::endpoints::EndpointRegistry;
use crate::error::{ConnectError, MappingError, ParamsError};
use crate::mapping::{apply_mapping, MappedParameterSet};
use crate::parameter_set::ParameterSet;
use crate::registry::Registry;
use crate::validation::validate;

/// Named set, or the first set in discovery order.
pub fn select_set(
    registry: &Registry,
    identifier: Option<&str>,
) -> Result<Arc<ParameterSet>, ParamsError> {
    match identifier {
        Some(id) => Ok(Arc::clone(registry.require(id)?)),
        None => registry
            .first()
            .cloned()
            .ok_or(ParamsError::NoParameterSets),
    }
}

/// Named enabled endpoint, or the first enabled endpoint `set` supports.
pub fn select_endpoint(
    endpoints: &EndpointRegistry,
    set: &ParameterSet,
    identifier: Option<&str>,
) -> Result<Arc<EndpointDeclaration>, ParamsError> {
    match identifier {
        Some(id) => Ok(Arc::clone(endpoints.require(id)?)),
        None => endpoints.first_supported(set).cloned().ok_or_else(|| {
            MappingError::NoEndpointAvailable {
                set: set.identifier.clone(),
            }
            .into()
        }),
    }
}

/// Validate `set`, then map it onto `endpoint`.
pub fn prepare(
    set: &ParameterSet,
    endpoint: &EndpointDeclaration,
) -> Result<MappedParameterSet, ParamsError> {
    let result = validate(set);
    if !result.is_valid() {
        return Err(ParamsError::Validation(result));
    }
    let mapped = apply_mapping(set, endpoint)?;
    for change in &mapped.changes {
        info!(
            "{}: {} {} -> {}",
            endpoint.identifier, change.name, change.before, change.after
        );
    }
    Ok(mapped)
}

/// Hand the endpoint's url and auth method to `connector`.
pub fn connect<C: Connector>(
    connector: &C,
    endpoint: &EndpointDeclaration,
) -> Result<C::Connection, C::Error> {
    info!(
        "connecting to {} ({}) using {}",
        endpoint.name, endpoint.url, endpoint.auth_method
    );
    connector.connect(&endpoint.url, endpoint.auth_method)
}

/// Full pipeline. The connector is only reached after validation and
/// mapping both succeed.
pub fn run<C: Connector>(
    registry: &Registry,
    endpoints: &EndpointRegistry,
    connector: &C,
    set: Option<&str>,
    endpoint: Option<&str>,
) -> Result<(C::Connection, MappedParameterSet), ConnectError<C::Error>> {
    let set = select_set(registry, set)?;
    let endpoint = select_endpoint(endpoints, &set, endpoint)?;
    debug!(
        "selected parameter set '{}' and endpoint '{}'",
        set.identifier, endpoint.identifier
    );
    let mapped = prepare(&set, &endpoint)?;
    let connection = connect(connector, &endpoint).map_err(ConnectError::Connector)?;
    Ok((connection, mapped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use udp_api_core::{AuthMethod, BandFamily, Constraints, ParameterDeclaration};

    fn registry() -> Registry {
        Registry::from_sets([ParameterSet::new("venice_lagoon", "Venice Lagoon, Italy")
            .with_supported_endpoints(["ds_development", "copernicus_explorer"])
            .with_parameter(ParameterDeclaration::new(
                "collection",
                Constraints::String,
                json!("SENTINEL2_L2A"),
            ))
            .with_parameter(ParameterDeclaration::new(
                "bands",
                Constraints::band_list(BandFamily::Sentinel2),
                json!(["B02", "B03"]),
            ))])
    }

    #[test]
    fn defaults_pick_first_set_and_first_supported_endpoint() {
        let registry = registry();
        let endpoints = EndpointRegistry::bundled().unwrap();
        let set = select_set(&registry, None).unwrap();
        let endpoint = select_endpoint(&endpoints, &set, None).unwrap();
        assert_eq!(endpoint.identifier, "copernicus_explorer");
    }

    #[test]
    fn empty_registry_has_no_default() {
        assert_eq!(
            select_set(&Registry::default(), None).unwrap_err(),
            ParamsError::NoParameterSets
        );
    }

    #[test]
    fn connector_failure_is_passed_through() {
        let registry = registry();
        let endpoints = EndpointRegistry::bundled().unwrap();
        let connector = |_: &str, _: AuthMethod| -> Result<(), &'static str> { Err("refused") };
        let err = run(&registry, &endpoints, &connector, None, Some("ds_development")).unwrap_err();
        assert_eq!(err.into_connector(), Some("refused"));
    }
}
