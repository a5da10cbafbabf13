//! Configuration for the form registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (forms.toml)
//! - Environment variables (FORMS__*)
//!
//! ## Example config file (forms.toml):
//! ```toml
//! [storage]
//! backend = "file"
//! path = "./forms-data"
//!
//! [collections]
//! provision_namespaces = true
//!
//! [listing]
//! suggestion_limit = 5
//! fuzzy_suggestions = true
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormsConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub collections: CollectionConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local; nothing survives the process
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the file backend
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Create a storage namespace when a collection is created
    #[serde(default = "default_true")]
    pub provision_namespaces: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Maximum names offered after a failed lookup
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,

    #[serde(default = "default_true")]
    pub fuzzy_suggestions: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./forms-data")
}

fn default_true() -> bool {
    true
}

fn default_suggestion_limit() -> usize {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: default_storage_path(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            provision_namespaces: true,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: default_suggestion_limit(),
            fuzzy_suggestions: true,
        }
    }
}

impl FormsConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in ["forms.toml", ".forms.toml", "config/forms.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "forms", "form-registry") {
            let xdg_config = dirs.config_dir().join("forms.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // FORMS__STORAGE__PATH=/srv/forms
        builder = builder.add_source(
            Environment::with_prefix("FORMS")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Storage root, resolved against the working directory
    pub fn storage_path(&self) -> PathBuf {
        if self.storage.path.is_absolute() {
            self.storage.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.storage.path)
        }
    }

    /// Problems that make this configuration unusable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.storage.backend == StorageBackend::File && self.storage.path.as_os_str().is_empty() {
            problems.push("storage.path must be set for the file backend".to_string());
        }
        if self.listing.fuzzy_suggestions && self.listing.suggestion_limit == 0 {
            problems.push("listing.suggestion_limit must be positive when fuzzy_suggestions is on".to_string());
        }
        problems
    }
}
