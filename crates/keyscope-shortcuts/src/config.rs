//! Router configuration
//!
//! Configuration is read from YAML or JSON, picked by file extension:
//!
//! ```yaml
//! chord_timeout_ms: 1000
//! report_unresolvable_scope: true
//! ```
//!
//! The default location is `<config dir>/keyscope/shortcuts.yaml`, e.g.
//! `~/.config/keyscope/shortcuts.yaml` on Linux. Missing fields take their
//! defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_CHORD_TIMEOUT_MS: u64 = 1000;

fn default_chord_timeout_ms() -> u64 {
    DEFAULT_CHORD_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

/// Settings for the shortcut map and key router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// How long a partially typed multi-chord sequence stays pending
    #[serde(default = "default_chord_timeout_ms")]
    pub chord_timeout_ms: u64,

    /// Emit a diagnostic when a window-scoped shortcut has no window
    #[serde(default = "default_true")]
    pub report_unresolvable_scope: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            chord_timeout_ms: DEFAULT_CHORD_TIMEOUT_MS,
            report_unresolvable_scope: true,
        }
    }
}

impl RouterConfig {
    /// Pending-chord timeout as a duration
    pub fn chord_timeout(&self) -> Duration {
        Duration::from_millis(self.chord_timeout_ms)
    }

    /// Parse YAML configuration
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, choosing the format by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no shortcut config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// `<config dir>/keyscope/shortcuts.yaml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keyscope").join("shortcuts.yaml"))
    }

    /// Check values that deserialize fine but make no sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chord_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "chord_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.chord_timeout(), Duration::from_secs(1));
        assert!(config.report_unresolvable_scope);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = RouterConfig::from_yaml_str("chord_timeout_ms: 250\n").unwrap();
        assert_eq!(config.chord_timeout_ms, 250);
        assert!(config.report_unresolvable_scope);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = RouterConfig::from_json_str(r#"{"chord_timeout_ms": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        if let Some(path) = RouterConfig::default_path() {
            assert!(path.ends_with("keyscope/shortcuts.yaml"));
        }
    }
}
