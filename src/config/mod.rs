//! Configuration for reportloom
//!
//! All settings are optional; an absent file means defaults everywhere.
//!
//! # Locations
//!
//! The configuration file is looked up in this order:
//!
//! 1. The path given with `--config`
//! 2. The `REPORTLOOM_CONFIG` environment variable
//! 3. `<config dir>/reportloom/config.toml` (`~/.config` on Linux,
//!    `~/Library/Application Support` on macOS, `%APPDATA%` on Windows)
//!
//! An explicitly named file must exist; the default location is optional.
//!
//! # Format
//!
//! ```toml
//! [container]
//! deflate_level = 1                 # 1 (fastest) ..= 9 (smallest)
//! stored_extensions = ["tiff"]      # stored uncompressed in addition to the built-in set
//!
//! [resources]
//! directory = "Pictures"            # where embedded images go inside the package
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::container::{CompressionPolicy, DEFAULT_DEFLATE_LEVEL};
use crate::core::{ReportError, Result};
use crate::resources::DEFAULT_RESOURCE_DIRECTORY;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "REPORTLOOM_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// How saved packages are compressed
    pub container: ContainerConfig,
    /// Where embedded resources are placed
    pub resources: ResourceConfig,
}

/// `[container]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Deflate level for compressible entries, 1..=9
    pub deflate_level: u32,
    /// Extensions stored uncompressed in addition to the built-in set
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stored_extensions: Vec<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            deflate_level: DEFAULT_DEFLATE_LEVEL,
            stored_extensions: Vec::new(),
        }
    }
}

impl ContainerConfig {
    /// The compression policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> CompressionPolicy {
        CompressionPolicy::new(self.deflate_level, &self.stored_extensions)
    }
}

/// `[resources]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceConfig {
    /// Package directory for embedded images
    pub directory: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_RESOURCE_DIRECTORY.to_string(),
        }
    }
}

impl RenderConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ReportError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ReportError::Config {
            message: format!("Failed to read config from {}: {e}", path.display()),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ReportError::Config { message } => ReportError::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    /// Load the configuration, looking in the standard locations.
    ///
    /// `explicit` (from `--config`) wins over the environment variable, which
    /// wins over the default location.
    pub fn load_with_optional(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match lookup_path(explicit, env_path) {
            Some((path, required)) if required || path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::load_from(&path)
            }
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// The default configuration file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reportloom").join("config.toml"))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=9).contains(&self.container.deflate_level) {
            return Err(ReportError::Config {
                message: format!(
                    "container.deflate_level must be between 1 and 9, got {}",
                    self.container.deflate_level
                ),
            });
        }
        let directory = self.resources.directory.trim_matches('/');
        if directory.is_empty() || directory.split('/').any(|part| part == "..") {
            return Err(ReportError::Config {
                message: format!(
                    "resources.directory must be a relative package path, got '{}'",
                    self.resources.directory
                ),
            });
        }
        Ok(())
    }
}

/// Pick the config file and whether it must exist.
fn lookup_path(explicit: Option<&Path>, env_path: Option<PathBuf>) -> Option<(PathBuf, bool)> {
    if let Some(path) = explicit {
        return Some((path.to_path_buf(), true));
    }
    if let Some(path) = env_path.filter(|path| !path.as_os_str().is_empty()) {
        return Some((path, true));
    }
    RenderConfig::default_path().map(|path| (path, false))
}
