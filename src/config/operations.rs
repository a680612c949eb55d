//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{Result, StoreError};
use crate::query::is_valid_name;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(StoreError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| StoreError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            StoreError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `root_element` must be a valid XML name
    /// - `lock_suffix` must be non-empty and contain no path separators
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.root_element) {
            return Err(StoreError::UserError(format!(
                "config validation failed: root_element '{}' is not a valid XML name",
                self.root_element
            )));
        }

        if self.lock_suffix.is_empty() {
            return Err(StoreError::UserError(
                "config validation failed: lock_suffix must be non-empty".to_string(),
            ));
        }

        if self.lock_suffix.contains(['/', '\\']) {
            return Err(StoreError::UserError(format!(
                "config validation failed: lock_suffix '{}' must not contain path separators",
                self.lock_suffix
            )));
        }

        Ok(())
    }

    /// Lock file path for a backing path: the backing path with `lock_suffix` appended.
    pub fn lock_path_for(&self, backing: &Path) -> PathBuf {
        let mut name = backing.as_os_str().to_os_string();
        name.push(&self.lock_suffix);
        PathBuf::from(name)
    }

    /// `lock_timeout_ms` as a duration.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
