//! Model registries
//!
//! A registry maps namespace URIs to the model documents contributing to
//! them, newest version first. The resolver asks it for candidates whenever
//! it meets a namespaced `sdfRef`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::RegistryConfig;
use crate::error::{Result, SdfError};
use crate::loader;
use crate::version::{insertion_index, model_version, VersionOrdering};
use crate::Definition;

/// Namespace URI, e.g. `https://onedm.org/models`
pub type NamespaceUri = str;

/// Model registry interface
pub trait Registry {
    /// Get all models for a namespace URI, newest version first
    ///
    /// Unknown namespaces yield no models.
    fn get_models(&self, ns: &NamespaceUri) -> Vec<Cow<'_, Definition>>;
}

/// The namespace URI a model contributes to
///
/// Looks up the model's `defaultNamespace` prefix in its `namespace` map.
pub fn contributed_namespace(model: &Definition) -> Result<&str> {
    let prefix = model
        .get("defaultNamespace")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            SdfError::MalformedRegistryEntry("model must have a defaultNamespace".to_string())
        })?;

    model
        .get("namespace")
        .and_then(|ns| ns.get(prefix))
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            SdfError::MalformedRegistryEntry(format!(
                "defaultNamespace '{}' is not declared in namespace",
                prefix
            ))
        })
}

/// A registry with no models
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRegistry;

impl Registry for NullRegistry {
    fn get_models(&self, _: &NamespaceUri) -> Vec<Cow<'_, Definition>> {
        Vec::new()
    }
}

/// A registry with pre-loaded models
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    ordering: VersionOrdering,
    db: HashMap<String, Vec<Definition>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ordering(ordering: VersionOrdering) -> Self {
        Self {
            ordering,
            db: HashMap::new(),
        }
    }

    /// Add a model
    ///
    /// The model must declare the namespace it contributes to.
    pub fn add_model(&mut self, model: Definition) -> Result<()> {
        let ns = contributed_namespace(&model)?.to_string();
        let models = self.db.entry(ns).or_default();
        let index = insertion_index(
            models.iter().map(model_version),
            model_version(&model),
            self.ordering,
        );
        models.insert(index, model);
        Ok(())
    }

    /// Namespace URIs with at least one model
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.db.keys().map(String::as_str)
    }

    /// Total number of models
    pub fn len(&self) -> usize {
        self.db.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl Registry for InMemoryRegistry {
    fn get_models(&self, ns: &NamespaceUri) -> Vec<Cow<'_, Definition>> {
        self.db
            .get(ns)
            .map(|models| models.iter().map(Cow::Borrowed).collect())
            .unwrap_or_default()
    }
}

/// An indexed model file
#[derive(Debug, Clone)]
struct IndexEntry {
    version: String,
    path: PathBuf,
}

/// A registry backed by model files in a directory tree
///
/// Only the namespace index is held in memory; models are parsed from disk
/// each time they are requested.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
    file_suffix: String,
    ordering: VersionOrdering,
    index: HashMap<String, Vec<IndexEntry>>,
}

impl DirectoryRegistry {
    /// Scan `root` for `*.sdf.json` models
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(root, &RegistryConfig::default())
    }

    /// Scan the directory named by the configuration
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let root = config.path.as_ref().ok_or_else(|| {
            SdfError::InvalidDefinition("no registry path configured".to_string())
        })?;
        Self::open_with(root, config)
    }

    fn open_with(root: impl AsRef<Path>, config: &RegistryConfig) -> Result<Self> {
        let mut registry = Self {
            root: root.as_ref().to_path_buf(),
            file_suffix: config.file_suffix.clone(),
            ordering: config.version_ordering,
            index: HashMap::new(),
        };
        registry.update()?;
        Ok(registry)
    }

    /// Get the root path of the registry
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rebuild the namespace index from the files currently on disk
    pub fn update(&mut self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(SdfError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("registry directory {} does not exist", self.root.display()),
            )));
        }

        let mut index: HashMap<String, Vec<IndexEntry>> = HashMap::new();

        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let is_model = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.ends_with(&self.file_suffix))
                .unwrap_or(false);
            if !is_model {
                continue;
            }

            let model = match loader::load_file(path) {
                Ok(model) => model,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable model");
                    continue;
                }
            };
            let ns = match contributed_namespace(&model) {
                Ok(ns) => ns.to_string(),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping model");
                    continue;
                }
            };

            let version = model_version(&model).to_string();
            let entries = index.entry(ns).or_default();
            let at = insertion_index(
                entries.iter().map(|e| e.version.as_str()),
                &version,
                self.ordering,
            );
            entries.insert(
                at,
                IndexEntry {
                    version,
                    path: path.to_path_buf(),
                },
            );
        }

        debug!(
            root = %self.root.display(),
            namespaces = index.len(),
            "Indexed model directory"
        );
        self.index = index;
        Ok(())
    }

    /// Namespace URIs with at least one model
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Paths of the models for a namespace, newest first
    pub fn paths(&self, ns: &NamespaceUri) -> Vec<&Path> {
        self.index
            .get(ns)
            .map(|entries| entries.iter().map(|e| e.path.as_path()).collect())
            .unwrap_or_default()
    }
}

impl Registry for DirectoryRegistry {
    fn get_models(&self, ns: &NamespaceUri) -> Vec<Cow<'_, Definition>> {
        let Some(entries) = self.index.get(ns) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| match loader::load_file(&entry.path) {
                Ok(model) => Some(Cow::Owned(model)),
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "Failed to load model");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::tempdir;

    fn model(version: Option<&str>, title: &str) -> Definition {
        let mut value = json!({
            "info": {"title": title},
            "namespace": {"ex": "https://example.com/ex"},
            "defaultNamespace": "ex",
        });
        if let Some(version) = version {
            value["info"]["version"] = Value::from(version);
        }
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn titles(models: &[Cow<'_, Definition>]) -> Vec<String> {
        models
            .iter()
            .map(|m| m["info"]["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_null_registry() {
        assert!(NullRegistry.get_models("https://example.com/ex").is_empty());
    }

    #[test]
    fn test_newest_first() {
        let mut registry = InMemoryRegistry::new();
        registry.add_model(model(Some("2021-01-01"), "old")).unwrap();
        registry.add_model(model(Some("2023-01-01"), "new")).unwrap();
        registry.add_model(model(Some("2022-01-01"), "mid")).unwrap();
        registry.add_model(model(None, "unversioned")).unwrap();

        let models = registry.get_models("https://example.com/ex");
        assert_eq!(titles(&models), ["new", "mid", "old", "unversioned"]);
        assert_eq!(registry.len(), 4);
        assert!(registry.get_models("https://example.com/other").is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut registry = InMemoryRegistry::new();
        registry.add_model(model(None, "a")).unwrap();
        registry.add_model(model(None, "b")).unwrap();

        let models = registry.get_models("https://example.com/ex");
        assert_eq!(titles(&models), ["a", "b"]);
    }

    #[test]
    fn test_add_model_requires_default_namespace() {
        let mut registry = InMemoryRegistry::new();
        let mut bad = model(None, "bad");
        bad.remove("defaultNamespace");
        assert!(matches!(
            registry.add_model(bad),
            Err(SdfError::MalformedRegistryEntry(_))
        ));

        let mut dangling = model(None, "dangling");
        dangling.insert("defaultNamespace".to_string(), json!("missing"));
        assert!(registry.add_model(dangling).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_directory_registry() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("old.sdf.json"),
            Value::Object(model(Some("1"), "old")).to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("nested/new.sdf.json"),
            Value::Object(model(Some("2"), "new")).to_string(),
        )
        .unwrap();
        // Skipped: wrong suffix, no namespace, not JSON
        fs::write(dir.path().join("other.json"), "{}").unwrap();
        fs::write(dir.path().join("anonymous.sdf.json"), r#"{"sdfData": {}}"#).unwrap();
        fs::write(dir.path().join("broken.sdf.json"), "{").unwrap();

        let mut registry = DirectoryRegistry::open(dir.path()).unwrap();
        let models = registry.get_models("https://example.com/ex");
        assert_eq!(titles(&models), ["new", "old"]);
        assert_eq!(registry.namespaces().count(), 1);

        fs::remove_file(dir.path().join("nested/new.sdf.json")).unwrap();
        registry.update().unwrap();
        let models = registry.get_models("https://example.com/ex");
        assert_eq!(titles(&models), ["old"]);
        assert_eq!(registry.paths("https://example.com/ex").len(), 1);
    }

    #[test]
    fn test_directory_registry_missing_root() {
        let dir = tempdir().unwrap();
        assert!(DirectoryRegistry::open(dir.path().join("nope")).is_err());
    }
}
