//! Rewrite a parameter set into one endpoint's naming vocabulary.

use hashbrown::HashMap;
use log::debug;
use serde::Serialize;
use serde_json::Value as JsonValue;

use udp_api_core::{Constraints, EndpointDeclaration, ParameterDeclaration};

use crate::error::MappingError;
use crate::parameter_set::{ParameterSet, BANDS, COLLECTION};
use crate::validation::validate_for_endpoint;

/// One default that mapping replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterChange {
    pub name: String,
    pub before: JsonValue,
    pub after: JsonValue,
}

/// A set rewritten for one endpoint. Holds identifiers of its origin only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedParameterSet {
    pub set: ParameterSet,
    pub source_identifier: String,
    pub endpoint_identifier: String,
    pub changes: Vec<ParameterChange>,
}

impl MappedParameterSet {
    pub fn get(&self, name: &str) -> Option<&ParameterDeclaration> {
        self.set.get(name)
    }

    pub fn collection(&self) -> Option<&str> {
        self.set.collection()
    }

    pub fn bands(&self) -> Option<Vec<&str>> {
        self.set.bands()
    }

    pub fn into_set(self) -> ParameterSet {
        self.set
    }
}

/// Map `set` onto `endpoint`.
///
/// Only `collection` and `bands` change. Nothing is returned unless the
/// endpoint offers every process the set requires and the rewritten set
/// validates against the endpoint's band format.
pub fn apply_mapping(
    set: &ParameterSet,
    endpoint: &EndpointDeclaration,
) -> Result<MappedParameterSet, MappingError> {
    if !set.supports(&endpoint.identifier) {
        return Err(MappingError::UnsupportedEndpoint {
            set: set.identifier.clone(),
            endpoint: endpoint.identifier.clone(),
        });
    }
    let missing = endpoint.missing_capabilities(&set.required_capabilities);
    if !missing.is_empty() {
        return Err(MappingError::MissingCapabilities {
            set: set.identifier.clone(),
            endpoint: endpoint.identifier.clone(),
            missing: missing.into_iter().map(String::from).collect(),
        });
    }

    let collection = set
        .get(COLLECTION)
        .ok_or_else(|| MappingError::MissingDeclaration {
            set: set.identifier.clone(),
            parameter: COLLECTION,
        })?;
    let mut replacements = vec![(
        collection,
        collection.with_default(JsonValue::String(endpoint.collection_id.clone())),
    )];

    match set.get(BANDS) {
        Some(bands) => replacements.push((bands, map_bands(set, bands, endpoint)?)),
        None if set.image_based => {
            return Err(MappingError::MissingDeclaration {
                set: set.identifier.clone(),
                parameter: BANDS,
            })
        }
        None => {}
    }

    let mut mapped = set.clone();
    let mut changes = Vec::new();
    for (before, decl) in replacements {
        if decl.default != before.default {
            changes.push(ParameterChange {
                name: decl.name.clone(),
                before: before.default.clone(),
                after: decl.default.clone(),
            });
        }
        mapped.parameters.insert(decl.name.clone(), decl);
    }

    let result = validate_for_endpoint(&mapped, endpoint);
    if !result.is_valid() {
        return Err(MappingError::InvalidResult {
            set: set.identifier.clone(),
            endpoint: endpoint.identifier.clone(),
            result,
        });
    }

    debug!(
        "mapped parameter set '{}' onto '{}' ({} change(s))",
        set.identifier,
        endpoint.identifier,
        changes.len()
    );
    Ok(MappedParameterSet {
        set: mapped,
        source_identifier: set.identifier.clone(),
        endpoint_identifier: endpoint.identifier.clone(),
        changes,
    })
}

fn map_bands(
    set: &ParameterSet,
    bands: &ParameterDeclaration,
    endpoint: &EndpointDeclaration,
) -> Result<ParameterDeclaration, MappingError> {
    let invalid = || MappingError::InvalidDeclaration {
        set: set.identifier.clone(),
        parameter: BANDS,
        expected: "a band-list of band names",
    };
    let Constraints::BandList { family, .. } = bands.constraints else {
        return Err(invalid());
    };
    let source = bands.default_strings().ok_or_else(invalid)?;

    let mut seen: HashMap<String, &str> = HashMap::with_capacity(source.len());
    let mut mapped = Vec::with_capacity(source.len());
    for band in source {
        let token = endpoint.format_band(band, family);
        if let Some(first) = seen.insert(token.clone(), band) {
            return Err(MappingError::DuplicateBand {
                endpoint: endpoint.identifier.clone(),
                first: first.to_string(),
                second: band.to_string(),
                token,
            });
        }
        mapped.push(JsonValue::String(token));
    }
    Ok(bands.with_default(JsonValue::Array(mapped)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use udp_api_core::{AuthMethod, BandCase, BandFamily, BandFormat, Constraints};

    fn explorer() -> EndpointDeclaration {
        EndpointDeclaration::new(
            "copernicus_explorer",
            "https://api.explorer.eopf.copernicus.eu/openeo",
            AuthMethod::OidcAuthorizationCode,
            "sentinel-2-l2a",
        )
        .with_band_format(
            BandFormat::parse("reflectance|{band}").unwrap(),
            BandCase::Lower,
        )
    }

    fn venice() -> ParameterSet {
        ParameterSet::new("venice_lagoon", "Venice Lagoon, Italy")
            .with_supported_endpoints(["copernicus_explorer", "copernicus_dataspace"])
            .with_parameter(ParameterDeclaration::new(
                "collection",
                Constraints::String,
                json!("SENTINEL2_L2A"),
            ))
            .with_parameter(ParameterDeclaration::new(
                "bands",
                Constraints::band_list(BandFamily::Sentinel2),
                json!(["B02", "B03", "B04"]),
            ))
            .with_parameter(ParameterDeclaration::new(
                "cloud_cover",
                Constraints::number(Some(0.0), Some(100.0)),
                json!(30),
            ))
    }

    #[test]
    fn rewrites_collection_and_bands_only() {
        let set = venice();
        let mapped = apply_mapping(&set, &explorer()).unwrap();
        assert_eq!(mapped.collection(), Some("sentinel-2-l2a"));
        assert_eq!(
            mapped.bands(),
            Some(vec!["reflectance|b02", "reflectance|b03", "reflectance|b04"])
        );
        assert_eq!(mapped.get("cloud_cover"), set.get("cloud_cover"));
        assert_eq!(mapped.source_identifier, "venice_lagoon");
        assert_eq!(mapped.endpoint_identifier, "copernicus_explorer");
        assert_eq!(
            mapped.changes.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            ["collection", "bands"]
        );
        // input untouched
        assert_eq!(set, venice());
    }

    #[test]
    fn unchanged_defaults_are_not_reported() {
        let dataspace = EndpointDeclaration::new(
            "copernicus_dataspace",
            "https://openeo.dataspace.copernicus.eu/",
            AuthMethod::Oidc,
            "SENTINEL2_L2A",
        );
        let mapped = apply_mapping(&venice(), &dataspace).unwrap();
        assert!(mapped.changes.is_empty());
        assert_eq!(mapped.set.parameters, venice().parameters);
    }

    #[test]
    fn unsupported_endpoint_is_rejected() {
        let other = EndpointDeclaration::new(
            "localhost_dev",
            "http://localhost:8081/",
            AuthMethod::Oidc,
            "sentinel-2-l2a",
        );
        assert!(matches!(
            apply_mapping(&venice(), &other),
            Err(MappingError::UnsupportedEndpoint { .. })
        ));
    }

    #[test]
    fn missing_declarations_fail_for_image_sets() {
        let mut set = venice();
        set.parameters.shift_remove("bands");
        assert!(matches!(
            apply_mapping(&set, &explorer()),
            Err(MappingError::MissingDeclaration { parameter: BANDS, .. })
        ));
        let set = set.with_image_based(false);
        let mapped = apply_mapping(&set, &explorer()).unwrap();
        assert_eq!(mapped.changes.len(), 1);

        let mut set = venice();
        set.parameters.shift_remove("collection");
        assert!(matches!(
            apply_mapping(&set, &explorer()),
            Err(MappingError::MissingDeclaration { parameter: COLLECTION, .. })
        ));
    }

    #[test]
    fn case_folding_collisions_are_errors() {
        let set = venice().with_parameter(ParameterDeclaration::new(
            "bands",
            Constraints::band_list(BandFamily::Sentinel2),
            json!(["B02", "b02"]),
        ));
        let err = apply_mapping(&set, &explorer()).unwrap_err();
        assert_eq!(
            err,
            MappingError::DuplicateBand {
                endpoint: "copernicus_explorer".into(),
                first: "B02".into(),
                second: "b02".into(),
                token: "reflectance|b02".into(),
            }
        );
    }

    #[test]
    fn invalid_mapped_result_is_rejected() {
        let set = venice().with_parameter(
            ParameterDeclaration::new(
                "collection",
                Constraints::Enum {
                    allowed: vec![json!("SENTINEL2_L2A")],
                },
                json!("SENTINEL2_L2A"),
            ),
        );
        assert!(matches!(
            apply_mapping(&set, &explorer()),
            Err(MappingError::InvalidResult { .. })
        ));
    }

    fn templated(identifier: &str, format: &str) -> EndpointDeclaration {
        EndpointDeclaration::new(identifier, "https://example.org/", AuthMethod::Oidc, "s2-l2a")
            .with_band_format(BandFormat::parse(format).unwrap(), BandCase::Preserve)
    }

    #[test]
    fn suffix_and_prefix_templates_map_and_validate() {
        for (format, expected) in [
            ("{band}_10m", ["B02_10m", "B03_10m", "B04_10m"]),
            ("s2:{band}", ["s2:B02", "s2:B03", "s2:B04"]),
        ] {
            let endpoint = templated("copernicus_explorer", format);
            let mapped = apply_mapping(&venice(), &endpoint)
                .unwrap_or_else(|e| panic!("{format}: {e}"));
            assert_eq!(mapped.bands(), Some(expected.to_vec()));
        }
    }

    #[test]
    fn resolution_template_uses_native_resolution() {
        let set = venice().with_parameter(ParameterDeclaration::new(
            "bands",
            Constraints::band_list(BandFamily::Sentinel2),
            json!(["B04", "B8A", "B01"]),
        ));
        let endpoint = templated("copernicus_explorer", "{band}_{resolution}m");
        let mapped = apply_mapping(&set, &endpoint).unwrap();
        assert_eq!(mapped.bands(), Some(vec!["B04_10m", "B8A_20m", "B01_60m"]));
    }

    #[test]
    fn missing_capabilities_refuse_the_endpoint() {
        let set = venice().with_required_capabilities(["load_collection", "run_udf"]);
        let endpoint = explorer().with_capabilities(["load_collection", "save_result"]);
        assert_eq!(
            apply_mapping(&set, &endpoint).unwrap_err(),
            MappingError::MissingCapabilities {
                set: "venice_lagoon".into(),
                endpoint: "copernicus_explorer".into(),
                missing: vec!["run_udf".into()],
            }
        );
        let endpoint = endpoint.with_capabilities(["load_collection", "run_udf"]);
        assert!(apply_mapping(&set, &endpoint).is_ok());
    }
}
