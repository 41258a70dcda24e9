//! Manager configuration

use ptm_estimate::EstimateLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration loading failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manager config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Project manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Label of the workspace root in listings
    pub root_name: String,
    /// Folder levels below a project searched for modules, and the deepest
    /// a module may be placed
    pub max_module_depth: usize,
    /// Folder levels searched by recursive detectors
    pub estimate_max_depth: usize,
    /// Largest file a detector reads, in bytes
    pub max_detector_file_bytes: usize,
    /// Reject `create_project` on an existing plain folder instead of adopting it
    pub strict_create: bool,
}

impl ManagerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML; absent keys keep their defaults
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed TOML or mistyped values
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `ConfigError` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// With root label
    #[inline]
    #[must_use]
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    /// With module depth bound
    #[inline]
    #[must_use]
    pub fn with_max_module_depth(mut self, depth: usize) -> Self {
        self.max_module_depth = depth;
        self
    }

    /// With recursive detector depth bound
    #[inline]
    #[must_use]
    pub fn with_estimate_max_depth(mut self, depth: usize) -> Self {
        self.estimate_max_depth = depth;
        self
    }

    /// With detector read cap
    #[inline]
    #[must_use]
    pub fn with_max_detector_file_bytes(mut self, bytes: usize) -> Self {
        self.max_detector_file_bytes = bytes;
        self
    }

    /// With strict create
    #[inline]
    #[must_use]
    pub fn with_strict_create(mut self, strict: bool) -> Self {
        self.strict_create = strict;
        self
    }

    /// Estimator bounds derived from this config
    #[inline]
    #[must_use]
    pub fn estimate_limits(&self) -> EstimateLimits {
        EstimateLimits {
            max_depth: self.estimate_max_depth,
            max_file_bytes: self.max_detector_file_bytes,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let limits = EstimateLimits::default();
        Self {
            root_name: "workspace".to_string(),
            max_module_depth: 16,
            estimate_max_depth: limits.max_depth,
            max_detector_file_bytes: limits.max_file_bytes,
            strict_create: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ManagerConfig::from_toml_str("max_module_depth = 3\nstrict_create = false\n").unwrap();
        assert_eq!(
            config,
            ManagerConfig::default()
                .with_max_module_depth(3)
                .with_strict_create(false)
        );
    }

    #[test]
    fn mistyped_value_is_rejected() {
        assert!(matches!(
            ManagerConfig::from_toml_str("max_module_depth = \"deep\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "root_name = \"demo\"\nestimate_max_depth = 2").unwrap();
        let config = ManagerConfig::load(file.path()).unwrap();
        assert_eq!(config.root_name, "demo");
        assert_eq!(config.estimate_limits().max_depth, 2);
        assert!(matches!(
            ManagerConfig::load("/no/such/config.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
