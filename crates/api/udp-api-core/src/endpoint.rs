//! Backend endpoint declarations.
//!
//! An endpoint describes how one processing backend names things: its
//! collection id, how a band token is spelled, which auth method it needs.

use std::collections::BTreeSet;
use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::bands::{normalize_band_name, BandFamily};

/// Placeholder substituted by [`BandFormat::render`].
pub const BAND_PLACEHOLDER: &str = "{band}";
/// Optional placeholder for the band's native resolution in metres.
pub const RESOLUTION_PLACEHOLDER: &str = "{resolution}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Basic,
    Oidc,
    #[serde(alias = "oidc-authorization-code")]
    OidcAuthorizationCode,
}

impl AuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMethod::Basic => "basic",
            AuthMethod::Oidc => "oidc",
            AuthMethod::OidcAuthorizationCode => "oidc_authorization_code",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case applied to a band token before it is substituted into the template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandCase {
    #[default]
    Preserve,
    Lower,
    Upper,
}

impl BandCase {
    pub fn apply(self, band: &str) -> String {
        match self {
            BandCase::Preserve => band.to_string(),
            BandCase::Lower => band.to_lowercase(),
            BandCase::Upper => band.to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BandFormatError {
    #[error("band format '{template}' must contain exactly one {{band}} placeholder, found {found}")]
    BandPlaceholder { template: String, found: usize },
    #[error("band format '{template}' may contain at most one {{resolution}} placeholder, found {found}")]
    ResolutionPlaceholder { template: String, found: usize },
    #[error("band format '{template}' needs literal text between {{band}} and {{resolution}}")]
    AdjacentPlaceholders { template: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    Band,
    Resolution,
}

/// Band and resolution read back out of a rendered token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandToken<'a> {
    pub band: &'a str,
    pub resolution: Option<u32>,
}

/// Band naming template with exactly one `{band}` placeholder and at most
/// one `{resolution}` placeholder, e.g. `"{band}"`, `"reflectance|{band}"`
/// or `"{band}_{resolution}m"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BandFormat {
    template: String,
    segments: Vec<Segment>,
}

impl BandFormat {
    pub fn parse(template: &str) -> Result<Self, BandFormatError> {
        let found = template.matches(BAND_PLACEHOLDER).count();
        if found != 1 {
            return Err(BandFormatError::BandPlaceholder {
                template: template.to_string(),
                found,
            });
        }
        let found = template.matches(RESOLUTION_PLACEHOLDER).count();
        if found > 1 {
            return Err(BandFormatError::ResolutionPlaceholder {
                template: template.to_string(),
                found,
            });
        }
        let segments = split_segments(template);
        let adjacent = segments
            .windows(2)
            .any(|w| !matches!(w[0], Segment::Literal(_)) && !matches!(w[1], Segment::Literal(_)));
        if adjacent {
            return Err(BandFormatError::AdjacentPlaceholders {
                template: template.to_string(),
            });
        }
        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// Template that leaves band tokens untouched.
    pub fn identity() -> Self {
        Self {
            template: BAND_PLACEHOLDER.to_string(),
            segments: vec![Segment::Band],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn is_identity(&self) -> bool {
        self.template == BAND_PLACEHOLDER
    }

    pub fn uses_resolution(&self) -> bool {
        self.segments.contains(&Segment::Resolution)
    }

    /// Spell `band` through the template. An unknown `resolution` renders
    /// as nothing, which [`BandFormat::extract`] then refuses.
    pub fn render(&self, band: &str, case: BandCase, resolution: Option<u32>) -> String {
        let mut out = String::with_capacity(self.template.len() + band.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Band => out.push_str(&case.apply(band)),
                Segment::Resolution => {
                    if let Some(metres) = resolution {
                        out.push_str(&metres.to_string());
                    }
                }
            }
        }
        out
    }

    /// Inverse of [`BandFormat::render`]: strip the literal parts of the
    /// template and return what the placeholders held.
    pub fn extract<'a>(&self, token: &'a str) -> Option<BandToken<'a>> {
        let mut rest = token;
        let mut band = None;
        let mut resolution = None;
        for (i, segment) in self.segments.iter().enumerate() {
            let value = match segment {
                Segment::Literal(text) => {
                    rest = rest.strip_prefix(text.as_str())?;
                    continue;
                }
                _ => {
                    let end = match self.segments.get(i + 1) {
                        Some(Segment::Literal(text)) if i + 2 == self.segments.len() => {
                            rest.strip_suffix(text.as_str())?.len()
                        }
                        Some(Segment::Literal(text)) => rest.find(text.as_str())?,
                        _ => rest.len(),
                    };
                    let (value, tail) = rest.split_at(end);
                    rest = tail;
                    value
                }
            };
            if value.is_empty() {
                return None;
            }
            match segment {
                Segment::Band => band = Some(value),
                Segment::Resolution if value.bytes().all(|b| b.is_ascii_digit()) => {
                    resolution = Some(value.parse().ok()?)
                }
                Segment::Resolution => return None,
                Segment::Literal(_) => {}
            }
        }
        if !rest.is_empty() {
            return None;
        }
        Some(BandToken {
            band: band?,
            resolution,
        })
    }
}

fn split_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;
    loop {
        let next = [
            (rest.find(BAND_PLACEHOLDER), BAND_PLACEHOLDER, Segment::Band),
            (rest.find(RESOLUTION_PLACEHOLDER), RESOLUTION_PLACEHOLDER, Segment::Resolution),
        ]
        .into_iter()
        .filter_map(|(at, marker, segment)| at.map(|at| (at, marker, segment)))
        .min_by_key(|(at, _, _)| *at);
        let Some((at, marker, segment)) = next else {
            break;
        };
        if at > 0 {
            segments.push(Segment::Literal(rest[..at].to_string()));
        }
        segments.push(segment);
        rest = &rest[at + marker.len()..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    segments
}

impl Default for BandFormat {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for BandFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl Serialize for BandFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.template)
    }
}

impl<'de> Deserialize<'de> for BandFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BandFormat::parse(&s).map_err(de::Error::custom)
    }
}

fn default_enabled() -> bool {
    true
}

/// One backend's identity and naming vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDeclaration {
    /// Registry key. Endpoint files key entries by identifier, so this is
    /// filled in by the loader rather than read from the entry body.
    #[serde(default)]
    pub identifier: String,
    /// Human readable display name.
    #[serde(default)]
    pub name: String,
    pub url: String,
    pub auth_method: AuthMethod,
    pub collection_id: String,
    #[serde(default)]
    pub band_format: BandFormat,
    #[serde(default)]
    pub band_case: BandCase,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_area_km2: Option<f64>,
    #[serde(default)]
    pub cloud_cover_filter: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl EndpointDeclaration {
    pub fn new(
        identifier: impl Into<String>,
        url: impl Into<String>,
        auth_method: AuthMethod,
        collection_id: impl Into<String>,
    ) -> Self {
        let identifier = identifier.into();
        Self {
            name: identifier.clone(),
            identifier,
            url: url.into(),
            auth_method,
            collection_id: collection_id.into(),
            band_format: BandFormat::identity(),
            band_case: BandCase::Preserve,
            description: String::new(),
            capabilities: BTreeSet::new(),
            max_area_km2: None,
            cloud_cover_filter: false,
            enabled: true,
        }
    }

    pub fn with_band_format(mut self, format: BandFormat, case: BandCase) -> Self {
        self.band_format = format;
        self.band_case = case;
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Spell one band token the way this endpoint expects it. The
    /// resolution comes from `family`.
    pub fn format_band(&self, band: &str, family: BandFamily) -> String {
        let resolution = family
            .info(&normalize_band_name(band))
            .map(|info| info.resolution);
        self.band_format.render(band, self.band_case, resolution)
    }

    pub fn supports_process(&self, process: &str) -> bool {
        self.capabilities.contains(process)
    }

    /// Required processes this endpoint does not offer, in the given order.
    pub fn missing_capabilities<'a, I>(&self, required: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        required
            .into_iter()
            .filter(|process| !self.supports_process(process))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn band_format_requires_single_placeholder() {
        assert!(BandFormat::parse("reflectance|{band}").is_ok());
        assert!(matches!(
            BandFormat::parse("reflectance"),
            Err(BandFormatError::BandPlaceholder { found: 0, .. })
        ));
        assert!(matches!(
            BandFormat::parse("{band}{band}"),
            Err(BandFormatError::BandPlaceholder { found: 2, .. })
        ));
        assert!(matches!(
            BandFormat::parse("{band}_{resolution}{resolution}"),
            Err(BandFormatError::ResolutionPlaceholder { found: 2, .. })
        ));
        assert!(matches!(
            BandFormat::parse("{band}{resolution}m"),
            Err(BandFormatError::AdjacentPlaceholders { .. })
        ));
    }

    #[test]
    fn renders_with_case_rule() {
        let f = BandFormat::parse("reflectance|{band}").unwrap();
        assert_eq!(f.render("B02", BandCase::Lower, None), "reflectance|b02");
        assert_eq!(f.render("B02", BandCase::Preserve, Some(10)), "reflectance|B02");
        assert_eq!(BandFormat::identity().render("b8a", BandCase::Upper, None), "B8A");
    }

    #[test]
    fn extract_strips_prefix_and_suffix() {
        let prefixed = BandFormat::parse("s2:{band}").unwrap();
        assert_eq!(prefixed.extract("s2:B02").map(|t| t.band), Some("B02"));
        assert_eq!(prefixed.extract("B02"), None);
        assert_eq!(prefixed.extract("s2:"), None);

        let suffixed = BandFormat::parse("{band}_10m").unwrap();
        assert_eq!(suffixed.extract("B8A_10m").map(|t| t.band), Some("B8A"));
        assert_eq!(suffixed.extract("B8A_20m"), None);

        let piped = BandFormat::parse("reflectance|{band}").unwrap();
        let token = piped.render("B11", BandCase::Lower, None);
        assert_eq!(
            piped.extract(&token),
            Some(BandToken {
                band: "b11",
                resolution: None
            })
        );
    }

    #[test]
    fn resolution_placeholder_round_trips() {
        let f = BandFormat::parse("{band}_{resolution}m").unwrap();
        assert!(f.uses_resolution());
        assert_eq!(f.render("B04", BandCase::Preserve, Some(10)), "B04_10m");
        assert_eq!(
            f.extract("B8A_20m"),
            Some(BandToken {
                band: "B8A",
                resolution: Some(20)
            })
        );
        assert_eq!(f.extract("B04_m"), None);
        assert_eq!(f.extract("B04_tenm"), None);
        assert_eq!(f.extract("B04_10"), None);
        assert_eq!(f.extract("B04_+10m"), None);
    }

    #[test]
    fn endpoint_reads_resolution_from_family() {
        let local = EndpointDeclaration::new(
            "localhost_dev",
            "http://localhost:8081/",
            AuthMethod::Oidc,
            "sentinel-2-l2a",
        )
        .with_band_format(
            BandFormat::parse("{band}_{resolution}m").unwrap(),
            BandCase::Preserve,
        );
        assert_eq!(local.format_band("B04", BandFamily::Sentinel2), "B04_10m");
        assert_eq!(local.format_band("B8A", BandFamily::Sentinel2), "B8A_20m");
        assert_eq!(local.format_band("B01", BandFamily::Sentinel2), "B01_60m");
    }

    #[test]
    fn missing_capabilities_keep_request_order() {
        let ep = EndpointDeclaration::new("e", "u", AuthMethod::Basic, "c")
            .with_capabilities(["load_collection", "save_result"]);
        let required: Vec<String> = ["save_result", "run_udf", "batch_processing"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            ep.missing_capabilities(&required),
            ["run_udf", "batch_processing"]
        );
        assert!(ep.missing_capabilities(&["load_collection".to_string()]).is_empty());
    }

    #[test]
    fn endpoint_entry_deserializes_with_defaults() {
        let ep: EndpointDeclaration = serde_json::from_value(json!({
            "url": "https://openeo.ds.io/",
            "auth_method": "oidc-authorization-code",
            "collection_id": "sentinel-2-l2a",
            "capabilities": ["load_collection", "save_result"]
        }))
        .unwrap();
        assert_eq!(ep.auth_method, AuthMethod::OidcAuthorizationCode);
        assert!(ep.enabled);
        assert!(ep.band_format.is_identity());
        assert!(ep.supports_process("save_result"));
    }

    #[test]
    fn invalid_band_format_fails_deserialization() {
        let res: Result<EndpointDeclaration, _> = serde_json::from_value(json!({
            "url": "u", "auth_method": "basic", "collection_id": "c", "band_format": "nope"
        }));
        assert!(res.is_err());
    }
}
