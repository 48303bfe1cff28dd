//! Configuration for the reminder engine.
//!
//! Loaded from `config.toml`; every section and field falls back to its
//! default when missing.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{NudgeError, Result};
use crate::recurrence::Cadence;
use crate::recurrence::types::DEFAULT_BODY_TEMPLATE;

/// Longest accepted default horizon, in months.
const MAX_HORIZON_MONTHS: u32 = 24;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Expansion caps and horizons.
    pub expansion: ExpansionConfig,
    /// Notification content and permission behaviour.
    pub notifications: NotificationConfig,
    /// Log filter used by the binaries.
    pub logging: LoggingConfig,
}

/// Bounds applied to every recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Cap for day, week and month granularity expansions.
    pub max_occurrences: usize,
    /// Cap for year granularity expansions.
    pub max_yearly_occurrences: usize,
    /// Window used when an open-ended pattern cannot be registered natively.
    pub default_horizon_months: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_occurrences: 100,
            max_yearly_occurrences: 10,
            default_horizon_months: 6,
        }
    }
}

impl ExpansionConfig {
    /// Occurrence cap for a recurrence of the given cadence.
    pub fn cap_for(&self, cadence: Cadence) -> usize {
        match cadence {
            Cadence::Fine => self.max_occurrences,
            Cadence::Coarse => self.max_yearly_occurrences,
        }
    }
}

/// Notification content settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Ask the OS for notification permission when it is not yet granted.
    pub request_permission: bool,
    /// Body for tasks without notes. Supports `{title}`, `{category}`, `{deadline}`.
    pub default_body: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            request_permission: true,
            default_body: DEFAULT_BODY_TEMPLATE.to_owned(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "nudge=info".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| NudgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| NudgeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the config at [`default_config_path`](Self::default_config_path),
    /// or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_config_path();
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings that would disable or unbound expansion.
    ///
    /// # Errors
    ///
    /// Returns [`NudgeError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.expansion.max_occurrences == 0 {
            return Err(NudgeError::Config(
                "expansion.max_occurrences must be at least 1".to_owned(),
            ));
        }
        if self.expansion.max_yearly_occurrences == 0 {
            return Err(NudgeError::Config(
                "expansion.max_yearly_occurrences must be at least 1".to_owned(),
            ));
        }
        if !(1..=MAX_HORIZON_MONTHS).contains(&self.expansion.default_horizon_months) {
            return Err(NudgeError::Config(format!(
                "expansion.default_horizon_months must be within 1..={MAX_HORIZON_MONTHS}"
            )));
        }
        Ok(())
    }

    /// Returns the config directory, `dirs::config_dir()/nudge/`.
    ///
    /// Override with the `NUDGE_CONFIG_DIR` environment variable.
    pub fn config_dir() -> PathBuf {
        if let Some(override_dir) = std::env::var_os("NUDGE_CONFIG_DIR") {
            return PathBuf::from(override_dir);
        }
        dirs::config_dir()
            .map(|d| d.join("nudge"))
            .unwrap_or_else(|| PathBuf::from("/tmp/nudge-config"))
    }

    /// Returns the default config file path: `<config_dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.expansion.max_occurrences, 100);
        assert_eq!(config.expansion.max_yearly_occurrences, 10);
        assert_eq!(config.expansion.default_horizon_months, 6);
        assert!(config.notifications.request_permission);
    }

    #[test]
    fn cap_depends_on_cadence() {
        let expansion = ExpansionConfig::default();
        assert_eq!(expansion.cap_for(Cadence::Fine), 100);
        assert_eq!(expansion.cap_for(Cadence::Coarse), 10);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.expansion.max_occurrences = 40;
        config.notifications.default_body = "{title} is due {deadline}".to_owned();
        config.logging.filter = "nudge=debug".to_owned();

        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[expansion]\nmax_yearly_occurrences = 3\n").unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.expansion.max_yearly_occurrences, 3);
        assert_eq!(loaded.expansion.max_occurrences, 100);
        assert_eq!(loaded.logging, LoggingConfig::default());
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = EngineConfig::from_file(&path);
        assert!(matches!(result, Err(NudgeError::Config(_))));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = EngineConfig::from_file(std::path::Path::new("/nonexistent/nudge/config.toml"));
        assert!(matches!(result, Err(NudgeError::Io(_))));
    }

    #[test]
    fn validation_rejects_zero_caps_and_long_horizons() {
        let mut config = EngineConfig::default();
        config.expansion.max_occurrences = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.expansion.default_horizon_months = 0;
        assert!(config.validate().is_err());

        config.expansion.default_horizon_months = 25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = EngineConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
