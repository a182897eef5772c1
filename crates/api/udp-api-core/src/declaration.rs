//! Parameter declarations: one named, typed, constrained parameter.
//!
//! A declaration is an explicit tagged record. Its `kind` comes from the
//! constraint variant, so kind and constraint shape can never disagree.
//!
//! JSON forms accepted by [`ParameterDeclaration::from_json`]:
//!   full:      { "kind": "number", "description": "...", "default": 30, "min": 0, "max": 100 }
//!   inferred:  { "description": "...", "default": ["B02", "B03"] }   (kind from name/default)
//!   shorthand: ["B02", "B03"]                                       (bare default value)

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::bands::BandFamily;
use crate::extent::describe;

/// Closed set of parameter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterKind {
    Bbox,
    TemporalRange,
    BandList,
    Enum,
    Number,
    String,
}

impl ParameterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKind::Bbox => "bbox",
            ParameterKind::TemporalRange => "temporal-range",
            ParameterKind::BandList => "band-list",
            ParameterKind::Enum => "enum",
            ParameterKind::Number => "number",
            ParameterKind::String => "string",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific constraints. Serialized with an inline `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Constraints {
    #[serde(alias = "spatial_bbox", alias = "spatial-bbox")]
    Bbox {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_area_km2: Option<f64>,
    },
    #[serde(alias = "temporal_range")]
    TemporalRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration_days: Option<i64>,
    },
    #[serde(alias = "band_list")]
    BandList {
        #[serde(default)]
        family: BandFamily,
        /// Overrides the family vocabulary when present.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vocabulary: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
    },
    Enum {
        allowed: Vec<JsonValue>,
    },
    #[serde(alias = "float")]
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    #[serde(alias = "str")]
    String,
}

impl Constraints {
    pub fn kind(&self) -> ParameterKind {
        match self {
            Constraints::Bbox { .. } => ParameterKind::Bbox,
            Constraints::TemporalRange { .. } => ParameterKind::TemporalRange,
            Constraints::BandList { .. } => ParameterKind::BandList,
            Constraints::Enum { .. } => ParameterKind::Enum,
            Constraints::Number { .. } => ParameterKind::Number,
            Constraints::String => ParameterKind::String,
        }
    }

    pub fn bbox() -> Self {
        Constraints::Bbox { max_area_km2: None }
    }

    pub fn temporal_range() -> Self {
        Constraints::TemporalRange {
            max_duration_days: None,
        }
    }

    pub fn band_list(family: BandFamily) -> Self {
        Constraints::BandList {
            family,
            vocabulary: None,
            required: Vec::new(),
        }
    }

    pub fn number(min: Option<f64>, max: Option<f64>) -> Self {
        Constraints::Number { min, max }
    }
}

#[derive(Debug, Error)]
pub enum DeclarationParseError {
    #[error("parameter '{name}': cannot infer kind from {found}")]
    UnknownKind { name: String, found: String },
    #[error("parameter '{name}': missing 'default'")]
    MissingDefault { name: String },
    #[error("parameter '{name}': 'description' must be a string")]
    InvalidDescription { name: String },
    #[error("parameter '{name}': invalid constraints: {source}")]
    Constraints {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One named parameter with its default value and constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDeclaration {
    pub name: String,
    pub description: String,
    pub default: JsonValue,
    #[serde(flatten)]
    pub constraints: Constraints,
}

impl ParameterDeclaration {
    /// Build a declaration whose description falls back to the title-cased name.
    pub fn new(name: impl Into<String>, constraints: Constraints, default: JsonValue) -> Self {
        let name = name.into();
        Self {
            description: title_case(&name),
            name,
            default,
            constraints,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = description;
        }
        self
    }

    pub fn kind(&self) -> ParameterKind {
        self.constraints.kind()
    }

    /// Copy of this declaration carrying a different default.
    pub fn with_default(&self, default: JsonValue) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            default,
            constraints: self.constraints.clone(),
        }
    }

    pub fn default_str(&self) -> Option<&str> {
        self.default.as_str()
    }

    /// String entries of an array default, if the default is an array of strings.
    pub fn default_strings(&self) -> Option<Vec<&str>> {
        self.default
            .as_array()?
            .iter()
            .map(|v| v.as_str())
            .collect()
    }

    /// Parse a declaration entry from a declaration file.
    pub fn from_json(name: &str, entry: &JsonValue) -> Result<Self, DeclarationParseError> {
        match entry {
            JsonValue::Object(obj) if obj.contains_key("kind") || obj.contains_key("default") => {
                Self::from_object(name, obj)
            }
            bare => {
                let constraints = infer_constraints(name, bare).ok_or_else(|| {
                    DeclarationParseError::UnknownKind {
                        name: name.to_string(),
                        found: describe(bare),
                    }
                })?;
                Ok(Self::new(name, constraints, bare.clone()))
            }
        }
    }

    fn from_object(
        name: &str,
        obj: &Map<String, JsonValue>,
    ) -> Result<Self, DeclarationParseError> {
        let mut rest = obj.clone();
        let default = rest
            .remove("default")
            .ok_or_else(|| DeclarationParseError::MissingDefault {
                name: name.to_string(),
            })?;
        let description = match rest.remove("description") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s),
            Some(_) => {
                return Err(DeclarationParseError::InvalidDescription {
                    name: name.to_string(),
                })
            }
        };
        // Declarations may repeat their own name; the map key is authoritative.
        rest.remove("name");

        let constraints = if rest.contains_key("kind") {
            serde_json::from_value(JsonValue::Object(rest)).map_err(|source| {
                DeclarationParseError::Constraints {
                    name: name.to_string(),
                    source,
                }
            })?
        } else {
            infer_constraints(name, &default).ok_or_else(|| DeclarationParseError::UnknownKind {
                name: name.to_string(),
                found: describe(&default),
            })?
        };

        let decl = Self::new(name, constraints, default);
        Ok(match description {
            Some(d) => decl.with_description(d),
            None => decl,
        })
    }
}

/// Infer constraints for an undeclared kind from the well-known parameter
/// names used by the notebooks, then from the JSON type of the default.
pub fn infer_constraints(name: &str, default: &JsonValue) -> Option<Constraints> {
    match name {
        "bounding_box" | "spatial_extent" | "bbox" => return Some(Constraints::bbox()),
        "time" | "temporal_extent" => return Some(Constraints::temporal_range()),
        "bands" => return Some(Constraints::band_list(BandFamily::default())),
        "collection" => return Some(Constraints::String),
        _ => {}
    }
    match default {
        JsonValue::Number(_) => Some(Constraints::number(None, None)),
        JsonValue::String(_) => Some(Constraints::String),
        _ => None,
    }
}

/// `cloud_cover` -> `Cloud Cover`
pub fn title_case(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_form_parses_constraints() {
        let d = ParameterDeclaration::from_json(
            "cloud_cover",
            &json!({
                "kind": "number", "description": "Max cloud", "default": 30, "min": 0, "max": 100
            }),
        )
        .unwrap();
        assert_eq!(d.kind(), ParameterKind::Number);
        assert_eq!(d.description, "Max cloud");
        assert_eq!(d.constraints, Constraints::number(Some(0.0), Some(100.0)));
    }

    #[test]
    fn shorthand_infers_kind_from_name() {
        let d = ParameterDeclaration::from_json("bands", &json!(["B04", "B8A"])).unwrap();
        assert_eq!(d.kind(), ParameterKind::BandList);
        assert_eq!(d.default_strings(), Some(vec!["B04", "B8A"]));
        let d =
            ParameterDeclaration::from_json("time", &json!(["2019-08-19", "2019-08-30"])).unwrap();
        assert_eq!(d.kind(), ParameterKind::TemporalRange);
        let d = ParameterDeclaration::from_json("cloud_cover", &json!(25)).unwrap();
        assert_eq!(d.kind(), ParameterKind::Number);
    }

    #[test]
    fn missing_description_falls_back_to_title_case() {
        let d = ParameterDeclaration::from_json(
            "cloud_cover",
            &json!({"default": 20, "description": ""}),
        )
        .unwrap();
        assert_eq!(d.description, "Cloud Cover");
    }

    #[test]
    fn unknown_shorthand_is_rejected() {
        let err = ParameterDeclaration::from_json("mystery", &json!([1, 2])).unwrap_err();
        assert!(matches!(err, DeclarationParseError::UnknownKind { .. }));
        let err = ParameterDeclaration::from_json("x", &json!({"kind": "polygon", "default": 1}))
            .unwrap_err();
        assert!(matches!(err, DeclarationParseError::Constraints { .. }));
    }

    #[test]
    fn band_list_with_explicit_family() {
        let d = ParameterDeclaration::from_json(
            "bands",
            &json!({
                "kind": "band-list",
                "family": "sentinel-2",
                "default": ["B02", "B8A"],
                "vocabulary": ["B02", "B8A", "B11"]
            }),
        )
        .unwrap();
        assert_eq!(
            d.constraints,
            Constraints::BandList {
                family: BandFamily::Sentinel2,
                vocabulary: Some(vec!["B02".into(), "B8A".into(), "B11".into()]),
                required: Vec::new(),
            }
        );
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["family"], "sentinel-2");
        let err = ParameterDeclaration::from_json(
            "bands",
            &json!({"kind": "band-list", "family": "landsat-8", "default": ["B02"]}),
        )
        .unwrap_err();
        assert!(matches!(err, DeclarationParseError::Constraints { .. }));
    }

    #[test]
    fn kind_aliases_from_older_declarations() {
        let d = ParameterDeclaration::from_json(
            "bounding_box",
            &json!({"kind": "spatial_bbox", "default": [0, 0, 1, 1]}),
        )
        .unwrap();
        assert_eq!(d.kind(), ParameterKind::Bbox);
    }

    #[test]
    fn serializes_with_inline_kind() {
        let d =
            ParameterDeclaration::new("collection", Constraints::String, json!("SENTINEL2_L2A"));
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["kind"], "string");
        assert_eq!(v["name"], "collection");
        assert_eq!(v["description"], "Collection");
    }

    #[test]
    fn with_default_preserves_identity() {
        let d = ParameterDeclaration::new("collection", Constraints::String, json!("A"))
            .with_description("Data collection identifier");
        let m = d.with_default(json!("b"));
        assert_eq!(m.name, d.name);
        assert_eq!(m.description, d.description);
        assert_eq!(m.default, json!("b"));
        assert_eq!(d.default, json!("A"));
    }
}
