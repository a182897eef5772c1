use serde_json::json;
use udp_params::{
    apply_mapping, validate, validate_for_endpoint, AuthMethod, BandCase, BandFamily, BandFormat,
    Constraint, Constraints, EndpointDeclaration, EndpointRegistry, MappingError,
    ParameterDeclaration, ParameterSet, Registry,
};
use udp_test_fixtures::trees;

fn notebooks() -> Registry {
    Registry::discover(trees::path("notebooks").expect("tree")).expect("discover")
}

fn endpoints() -> EndpointRegistry {
    EndpointRegistry::bundled().expect("bundled")
}

/// it should map every notebook set onto every endpoint it supports
#[test]
fn supported_endpoints_always_map_to_valid_sets() {
    let registry = notebooks();
    let endpoints = endpoints();
    let mut pairs = 0;
    for set in registry.parameter_sets() {
        assert!(validate(set).is_valid(), "{}", validate(set));
        for id in &set.supported_endpoints {
            let endpoint = endpoints.require(id).expect("endpoint");
            let mapped = apply_mapping(set, endpoint)
                .unwrap_or_else(|e| panic!("{} on {id}: {e}", set.identifier));
            assert!(validate_for_endpoint(&mapped.set, endpoint).is_valid());
            assert_eq!(mapped.collection(), Some(endpoint.collection_id.as_str()));
            pairs += 1;
        }
    }
    assert_eq!(pairs, 3 + 3 + 3 + 2 + 3 * 2);
}

/// it should not depend on which endpoint was mapped first
#[test]
fn mapping_is_order_independent() {
    let registry = notebooks();
    let endpoints = endpoints();
    let set = registry.get("venice_lagoon").expect("venice");
    let ids: Vec<&String> = set.supported_endpoints.iter().collect();

    let forward: Vec<_> = ids
        .iter()
        .map(|id| apply_mapping(set, endpoints.require(id).expect("ep")).expect("map"))
        .collect();
    let mut backward: Vec<_> = ids
        .iter()
        .rev()
        .map(|id| apply_mapping(set, endpoints.require(id).expect("ep")).expect("map"))
        .collect();
    backward.reverse();
    assert_eq!(forward, backward);

    // and mapping twice gives the same result
    let explorer = endpoints.require("copernicus_explorer").expect("explorer");
    assert_eq!(
        apply_mapping(set, explorer).expect("first"),
        apply_mapping(set, explorer).expect("second")
    );
}

/// it should return the same result on repeated validation
#[test]
fn validation_is_idempotent() {
    let registry = notebooks();
    for set in registry.parameter_sets() {
        assert_eq!(validate(set), validate(set));
    }
    let broken = ParameterSet::new("broken", "Nowhere").with_parameter(ParameterDeclaration::new(
        "bands",
        Constraints::band_list(BandFamily::Sentinel2),
        json!(["B02", "B02", "X9"]),
    ));
    let first = validate(&broken);
    assert!(!first.is_valid());
    assert_eq!(first, validate(&broken));
}

/// it should spell B02..B04 through a lower-casing reflectance template
#[test]
fn band_template_round_trip() {
    let endpoint = EndpointDeclaration::new(
        "zarr",
        "https://example.org/openeo",
        AuthMethod::Oidc,
        "sentinel-2-l2a",
    )
    .with_band_format(
        BandFormat::parse("reflectance|{band}").expect("template"),
        BandCase::Lower,
    );
    let set = ParameterSet::new("s", "Somewhere")
        .with_supported_endpoints(["zarr"])
        .with_parameter(ParameterDeclaration::new(
            "collection",
            Constraints::String,
            json!("SENTINEL2_L2A"),
        ))
        .with_parameter(ParameterDeclaration::new(
            "bands",
            Constraints::band_list(BandFamily::Sentinel2),
            json!(["B02", "B03", "B04"]),
        ));
    let mapped = apply_mapping(&set, &endpoint).expect("map");
    assert_eq!(
        mapped.bands(),
        Some(vec!["reflectance|b02", "reflectance|b03", "reflectance|b04"])
    );
    let change = mapped
        .changes
        .iter()
        .find(|c| c.name == "bands")
        .expect("bands change");
    assert_eq!(change.before, json!(["B02", "B03", "B04"]));
}

/// it should map and validate through suffix and non-pipe prefix templates
#[test]
fn suffix_and_prefix_templates_validate() {
    let set = ParameterSet::clone(notebooks().get("lake_taihu").expect("lake_taihu"));
    for (format, first) in [("{band}_10m", "B02_10m"), ("s2:{band}", "s2:B02")] {
        let endpoint = EndpointDeclaration::new(
            "ds_development",
            "https://openeo.ds.io/",
            AuthMethod::Oidc,
            "sentinel-2-l2a",
        )
        .with_band_format(BandFormat::parse(format).expect("template"), BandCase::Preserve);
        let mapped = apply_mapping(&set, &endpoint).unwrap_or_else(|e| panic!("{format}: {e}"));
        assert_eq!(mapped.bands().and_then(|b| b.first().copied()), Some(first));
        assert!(validate_for_endpoint(&mapped.set, &endpoint).is_valid());
    }
}

/// it should tag each band with its native resolution on localhost_dev
#[test]
fn localhost_dev_appends_native_resolution() {
    let registry = notebooks();
    let endpoints = endpoints();
    let set = registry.get("lake_victoria").expect("lake_victoria");
    let localhost = endpoints.require("localhost_dev").expect("localhost_dev");
    let mapped = apply_mapping(set, localhost).expect("map");
    assert_eq!(
        mapped.bands(),
        Some(vec!["B02_10m", "B03_10m", "B04_10m", "B05_20m", "B08_10m", "B8A_20m", "B11_20m"])
    );
    assert_eq!(mapped.collection(), Some("sentinel-2-l2a"));
    // the plain check does not know the endpoint's spelling
    assert!(validate(&mapped.set).has("bands", Constraint::UnknownBand));
}

/// it should reject a bbox whose west edge is east of its east edge
#[test]
fn inverted_bbox_fails_validation() {
    let set = ParameterSet::new("s", "Somewhere").with_parameter(ParameterDeclaration::new(
        "bounding_box",
        Constraints::bbox(),
        json!({"west": 12.6, "south": 45.25, "east": 12.0, "north": 45.6}),
    ));
    let result = validate(&set);
    assert!(result.has("bounding_box", Constraint::WestBeforeEast));
    assert_eq!(result.len(), 1);
}

/// it should reject a temporal range that ends before it starts
#[test]
fn inverted_temporal_range_fails_validation() {
    let set = ParameterSet::new("s", "Somewhere").with_parameter(ParameterDeclaration::new(
        "time",
        Constraints::temporal_range(),
        json!(["2023-06-30", "2023-06-01"]),
    ));
    let result = validate(&set);
    assert!(result.has("time", Constraint::TemporalOrder));
    assert!(result.to_string().contains("2023-06-30"));
}

/// it should leave the source set untouched when mapping fails
#[test]
fn failed_mapping_is_all_or_nothing() {
    let registry = notebooks();
    let endpoints = endpoints();
    let set = registry.get("gran_canaria").expect("gran_canaria");
    let before = (**set).clone();
    let err = apply_mapping(set, endpoints.require("copernicus_explorer").expect("ep"))
        .unwrap_err();
    assert!(matches!(err, MappingError::UnsupportedEndpoint { .. }));
    assert_eq!(**set, before);
}
