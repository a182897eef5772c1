//! Manifest-driven access to the shared `fixtures/` tree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    declarations: HashMap<String, String>,
    trees: HashMap<String, String>,
    endpoints: HashMap<String, String>,
    configs: HashMap<String, String>,
}

pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

fn sorted_keys(map: &HashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Single `*.params.json` declaration files.
pub mod declarations {
    use super::*;

    pub fn keys() -> Vec<String> {
        sorted_keys(&MANIFEST.declarations)
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.declarations, "declaration", name)?)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        super::load_json(lookup(&MANIFEST.declarations, "declaration", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.declarations, "declaration", name)?))
    }
}

/// Directory trees used as discovery roots.
pub mod trees {
    use super::*;

    pub fn keys() -> Vec<String> {
        sorted_keys(&MANIFEST.trees)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let path = resolve_path(lookup(&MANIFEST.trees, "tree", name)?);
        if !path.is_dir() {
            return Err(anyhow!("tree fixture '{name}' is not a directory: {}", path.display()));
        }
        Ok(path)
    }
}

/// Endpoint registry files.
pub mod endpoints {
    use super::*;

    pub fn keys() -> Vec<String> {
        sorted_keys(&MANIFEST.endpoints)
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.endpoints, "endpoints", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.endpoints, "endpoints", name)?))
    }
}

/// Engine configuration files.
pub mod configs {
    use super::*;

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.configs, "config", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.configs, "config", name)?))
    }
}
