//! Discovery and lookup of parameter sets.
//!
//! A registry is built once from a directory tree and then only read. Files
//! are visited in lexicographic path order; sets keep their in-file order.
//! A file that fails to load is skipped with a warning and recorded.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;
use crate::endpoints::EndpointRegistry;
use crate::error::{DeclarationError, NotFoundError, RegistryError};
use crate::parameter_set::{ParameterSet, RawParameterSet};

/// A declaration file or set that discovery left out, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDeclaration {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    root: Option<PathBuf>,
    config: DiscoveryConfig,
    sets: Vec<Arc<ParameterSet>>,
    index: HashMap<String, usize>,
    files: BTreeMap<PathBuf, Vec<String>>,
    skipped: Vec<SkippedDeclaration>,
}

impl Registry {
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, RegistryError> {
        Self::discover_with(root, DiscoveryConfig::default())
    }

    pub fn discover_with(
        root: impl AsRef<Path>,
        config: DiscoveryConfig,
    ) -> Result<Self, RegistryError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(RegistryError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut walker = WalkDir::new(root).follow_links(config.follow_links);
        if let Some(depth) = config.max_depth {
            walker = walker.max_depth(depth);
        }
        let mut paths = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let is_declaration = entry.file_type().is_file()
                        && entry
                            .file_name()
                            .to_str()
                            .is_some_and(|name| config.matches(name));
                    if is_declaration {
                        paths.push(entry.into_path());
                    }
                }
                Err(err) => warn!("skipping unreadable entry under {}: {err}", root.display()),
            }
        }
        paths.sort();

        let mut registry = Self {
            root: Some(root.to_path_buf()),
            config,
            ..Self::default()
        };
        for path in paths {
            match load_declaration_file(&path, &registry.config) {
                Ok(sets) => registry.insert_file(path, sets),
                Err(err) => {
                    warn!("skipping declaration file: {err}");
                    registry.skipped.push(SkippedDeclaration {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }
        debug!(
            "discovered {} parameter set(s) in {} file(s) under {}",
            registry.sets.len(),
            registry.files.len(),
            root.display()
        );
        Ok(registry)
    }

    /// Registry holding the sets of a single declaration file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let mut registry = Self::default();
        let sets = load_declaration_file(path, &registry.config)?;
        registry.insert_file(path.to_path_buf(), sets);
        Ok(registry)
    }

    /// In-memory registry. Later duplicates of an identifier are skipped.
    pub fn from_sets<I>(sets: I) -> Self
    where
        I: IntoIterator<Item = ParameterSet>,
    {
        let mut registry = Self::default();
        for set in sets {
            registry.insert(set);
        }
        registry
    }

    /// Rebuild from the same root, replacing everything. No-op for
    /// registries that were not discovered from a directory.
    pub fn rediscover(&mut self) -> Result<(), RegistryError> {
        if let Some(root) = self.root.clone() {
            *self = Self::discover_with(root, self.config.clone())?;
        }
        Ok(())
    }

    fn insert_file(&mut self, path: PathBuf, sets: Vec<ParameterSet>) {
        let mut kept = Vec::with_capacity(sets.len());
        for set in sets {
            let identifier = set.identifier.clone();
            if self.insert(set) {
                kept.push(identifier);
            } else {
                self.skipped.push(SkippedDeclaration {
                    path: path.clone(),
                    reason: format!("duplicate parameter set '{identifier}'"),
                });
            }
        }
        self.files.insert(path, kept);
    }

    fn insert(&mut self, set: ParameterSet) -> bool {
        if self.index.contains_key(&set.identifier) {
            let location = set
                .source()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".into());
            warn!(
                "parameter set '{}' from {location} is already registered; keeping the first",
                set.identifier
            );
            return false;
        }
        self.index.insert(set.identifier.clone(), self.sets.len());
        self.sets.push(Arc::new(set));
        true
    }

    pub fn parameter_sets(&self) -> &[Arc<ParameterSet>] {
        &self.sets
    }

    pub fn get(&self, identifier: &str) -> Option<&Arc<ParameterSet>> {
        self.index.get(identifier).map(|&i| &self.sets[i])
    }

    pub fn require(&self, identifier: &str) -> Result<&Arc<ParameterSet>, NotFoundError> {
        self.get(identifier)
            .ok_or_else(|| NotFoundError::set(identifier, self.identifiers()))
    }

    pub fn first(&self) -> Option<&Arc<ParameterSet>> {
        self.sets.first()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.sets.iter().map(|s| s.identifier.clone()).collect()
    }

    /// Sets whose identifier or algorithm equals or contains `name`.
    pub fn find_by_algorithm(&self, name: &str) -> Vec<Arc<ParameterSet>> {
        self.sets
            .iter()
            .filter(|s| s.identifier.contains(name) || s.algorithm.contains(name))
            .cloned()
            .collect()
    }

    /// Sets that list `endpoint` as supported, in discovery order.
    pub fn find_compatible(&self, endpoint: &str) -> Vec<Arc<ParameterSet>> {
        self.sets
            .iter()
            .filter(|s| s.supports(endpoint))
            .cloned()
            .collect()
    }

    /// `(set, endpoint)` pairs naming endpoints that `endpoints` does not know.
    pub fn dangling_endpoints(&self, endpoints: &EndpointRegistry) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        for set in &self.sets {
            for endpoint in &set.supported_endpoints {
                if !endpoints.contains(endpoint) {
                    dangling.push((set.identifier.clone(), endpoint.clone()));
                }
            }
        }
        dangling
    }

    pub fn skipped(&self) -> &[SkippedDeclaration] {
        &self.skipped
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn source_files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Parse one declaration file into its sets, in file order.
pub fn load_declaration_file(
    path: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<ParameterSet>, DeclarationError> {
    let text = fs::read_to_string(path).map_err(|source| DeclarationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: IndexMap<String, RawParameterSet> =
        serde_json::from_str(&text).map_err(|source| DeclarationError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if raw.is_empty() {
        return Err(DeclarationError::Empty {
            path: path.to_path_buf(),
        });
    }

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let algorithm = config
        .algorithm_name(file_name)
        .or_else(|| path.file_stem().and_then(|s| s.to_str()))
        .unwrap_or_default();

    let mut sets = Vec::with_capacity(raw.len());
    for (identifier, body) in raw {
        let set_error = |source| DeclarationError::Set {
            path: path.to_path_buf(),
            source,
        };
        let set = ParameterSet::from_raw(&identifier, algorithm, body).map_err(set_error)?;
        set.check_required().map_err(set_error)?;
        debug!(
            "loaded parameter set '{}' ({} parameter(s)) from {}",
            identifier,
            set.len(),
            path.display()
        );
        sets.push(set.with_source(path));
    }
    Ok(sets)
}
