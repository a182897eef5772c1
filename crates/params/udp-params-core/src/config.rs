//! Discovery and engine configuration.
//!
//! ```json
//! {
//!   "declarations_root": "notebooks",
//!   "endpoints_file": "endpoints.json",
//!   "discovery": { "suffix": ".params.json", "max_depth": 4 }
//! }
//! ```
//! Relative paths are resolved against the directory of the config file.
//! Without `endpoints_file` the bundled endpoint registry is used.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::endpoints::EndpointRegistry;
use crate::error::ConfigError;
use crate::registry::Registry;

pub const DEFAULT_SUFFIX: &str = ".params.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File name suffix identifying declaration files.
    pub suffix: String,
    /// Maximum directory depth below the root; unlimited when absent.
    pub max_depth: Option<usize>,
    pub follow_links: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            max_depth: None,
            follow_links: false,
        }
    }
}

impl DiscoveryConfig {
    pub fn matches(&self, file_name: &str) -> bool {
        self.algorithm_name(file_name).is_some()
    }

    /// `apa.params.json` -> `apa`. `None` when the name does not carry the suffix.
    pub fn algorithm_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_suffix(self.suffix.as_str())
            .filter(|stem| !stem.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub declarations_root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints_file: Option<PathBuf>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl EngineConfig {
    pub fn new(declarations_root: impl Into<PathBuf>) -> Self {
        Self {
            declarations_root: declarations_root.into(),
            endpoints_file: None,
            discovery: DiscoveryConfig::default(),
        }
    }

    pub fn with_endpoints_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.endpoints_file = Some(path.into());
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            what: "engine config".into(),
            source,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            what: path.display().to_string(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if self.declarations_root.is_relative() {
            self.declarations_root = base.join(&self.declarations_root);
        }
        if let Some(file) = self.endpoints_file.as_mut() {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
    }

    pub fn load_registry(&self) -> Result<Registry, ConfigError> {
        Ok(Registry::discover_with(
            &self.declarations_root,
            self.discovery.clone(),
        )?)
    }

    pub fn load_endpoints(&self) -> Result<EndpointRegistry, ConfigError> {
        match &self.endpoints_file {
            Some(path) => EndpointRegistry::from_path(path),
            None => EndpointRegistry::bundled(),
        }
    }
}
