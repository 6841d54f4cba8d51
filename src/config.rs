//! Configuration management for SDF resolution
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (sdf.toml)
//! - Environment variables (SDF__*)
//!
//! ## Example config file (sdf.toml):
//! ```toml
//! [registry]
//! path = "./models"
//! file_suffix = ".sdf.json"
//! version_ordering = "lexicographic"
//!
//! [resolver]
//! max_depth = 64
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::version::VersionOrdering;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdfConfig {
    /// Model registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory scanned for model files
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Suffix identifying model files
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// How `info.version` strings are ordered
    #[serde(default)]
    pub version_ordering: VersionOrdering,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum number of nested references expanded at once
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_file_suffix() -> String {
    ".sdf.json".to_string()
}

fn default_max_depth() -> usize {
    64
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: None,
            file_suffix: default_file_suffix(),
            version_ordering: VersionOrdering::default(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl SdfConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["sdf.toml", ".sdf.toml", "config/sdf.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "onedm", "sdf") {
            let xdg_config = config_dir.config_dir().join("sdf.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SDF__REGISTRY__PATH, SDF__RESOLVER__MAX_DEPTH, ...
        builder = builder.add_source(
            Environment::with_prefix("SDF")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the registry path (resolves relative paths)
    pub fn registry_path(&self) -> Option<PathBuf> {
        self.registry.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        })
    }
}
