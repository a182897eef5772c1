//! Canonical band vocabularies and band-name normalization.
//!
//! Backends spell the same spectral band differently (`B02`, `b02`,
//! `reflectance|b02`). Every spelling is reduced to the canonical upper-case
//! token before it is compared against a family vocabulary.

use serde::{Deserialize, Serialize};

/// Static description of one canonical band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandInfo {
    pub name: &'static str,
    pub label: &'static str,
    /// Center wavelength in nanometres.
    pub center_wavelength: u32,
    /// Native ground resolution in metres.
    pub resolution: u32,
}

const SENTINEL2_BANDS: &[BandInfo] = &[
    band("B01", "Coastal aerosol", 443, 60),
    band("B02", "Blue", 490, 10),
    band("B03", "Green", 560, 10),
    band("B04", "Red", 665, 10),
    band("B05", "Red Edge 1", 705, 20),
    band("B06", "Red Edge 2", 740, 20),
    band("B07", "Red Edge 3", 783, 20),
    band("B08", "NIR", 842, 10),
    band("B8A", "NIR Narrow", 865, 20),
    band("B09", "Water vapour", 945, 60),
    band("B10", "SWIR Cirrus", 1375, 60),
    band("B11", "SWIR 1", 1610, 20),
    band("B12", "SWIR 2", 2190, 20),
];

const fn band(
    name: &'static str,
    label: &'static str,
    center_wavelength: u32,
    resolution: u32,
) -> BandInfo {
    BandInfo {
        name,
        label,
        center_wavelength,
        resolution,
    }
}

/// Collection family a band list is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandFamily {
    #[default]
    #[serde(rename = "sentinel-2", alias = "sentinel2", alias = "sentinel_2")]
    Sentinel2,
}

impl BandFamily {
    /// All canonical bands of the family, in spectral order.
    pub fn bands(self) -> &'static [BandInfo] {
        match self {
            BandFamily::Sentinel2 => SENTINEL2_BANDS,
        }
    }

    pub fn contains(self, canonical: &str) -> bool {
        self.info(canonical).is_some()
    }

    pub fn info(self, canonical: &str) -> Option<&'static BandInfo> {
        self.bands().iter().find(|b| b.name == canonical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BandFamily::Sentinel2 => "sentinel-2",
        }
    }
}

/// Reduce any backend spelling of a band to its canonical token.
///
/// `reflectance|b02` -> `B02`, `b8a` -> `B8A`, `02` -> `B02`.
pub fn normalize_band_name(band: &str) -> String {
    let token = band.rsplit('|').next().unwrap_or(band).trim();
    let mut out = token.to_uppercase();
    if !out.starts_with('B') {
        out.insert(0, 'B');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backend_spellings() {
        assert_eq!(normalize_band_name("B02"), "B02");
        assert_eq!(normalize_band_name("b8a"), "B8A");
        assert_eq!(normalize_band_name("reflectance|b11"), "B11");
        assert_eq!(normalize_band_name("02"), "B02");
    }

    #[test]
    fn sentinel2_vocabulary_has_thirteen_bands() {
        let family = BandFamily::Sentinel2;
        assert_eq!(family.bands().len(), 13);
        assert!(family.contains("B8A"));
        assert!(!family.contains("B13"));
        assert_eq!(family.info("B04").map(|b| b.resolution), Some(10));
    }

    #[test]
    fn family_accepts_aliases() {
        for spelling in ["\"sentinel-2\"", "\"sentinel2\"", "\"sentinel_2\""] {
            let f: BandFamily = serde_json::from_str(spelling).unwrap();
            assert_eq!(f, BandFamily::Sentinel2);
        }
        let f = BandFamily::Sentinel2;
        assert_eq!(serde_json::to_string(&f).unwrap(), "\"sentinel-2\"");
        assert_eq!(serde_json::to_value(f).unwrap(), f.as_str());
    }
}
