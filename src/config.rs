//! Board configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `DEALBOARD_*` environment variables (nested keys joined with `__`, e.g.
//! `DEALBOARD_REST__BASE_URL`).

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::board::DEFAULT_ACTIVATION_DISTANCE;
use crate::error::{BoardError, BoardResult};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DEALBOARD";

/// Default bound on a pending stage confirmation.
pub const DEFAULT_CONFIRM_TIMEOUT_MS: u64 = 15_000;

/// Message shown when a failed confirmation carries no backend message.
pub const DEFAULT_FALLBACK_ERROR_MESSAGE: &str = "Failed to update deal stage";

/// Settings for the HTTP stage confirmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.example.co`.
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "deals".to_string()
}

/// Configuration for the board controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Upper bound on waiting for a stage confirmation, in milliseconds.
    /// `0` waits indefinitely.
    /// Default: 15000
    pub confirm_timeout_ms: u64,

    /// Pointer travel in pixels before a press turns into a drag.
    /// Default: 8.0
    pub activation_distance: f64,

    /// Shown when a failed confirmation has no backend message.
    pub fallback_error_message: String,

    /// Capacity of the notice channel; notices beyond it are dropped.
    /// Default: 32
    pub notice_capacity: usize,

    /// HTTP confirmer settings, if the board talks to a REST backend.
    pub rest: Option<RestConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_ms: DEFAULT_CONFIRM_TIMEOUT_MS,
            activation_distance: DEFAULT_ACTIVATION_DISTANCE,
            fallback_error_message: DEFAULT_FALLBACK_ERROR_MESSAGE.to_string(),
            notice_capacity: 32,
            rest: None,
        }
    }
}

impl BoardConfig {
    /// Creates a BoardConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads defaults, then `path` if given and present, then the environment.
    pub fn load(path: Option<&Path>) -> BoardResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config: BoardConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the controller cannot work with.
    pub fn validate(&self) -> BoardResult<()> {
        if !self.activation_distance.is_finite() || self.activation_distance < 0.0 {
            return Err(BoardError::InvalidConfig(format!(
                "activation_distance must be a non-negative number, got {}",
                self.activation_distance
            )));
        }
        if self.notice_capacity == 0 {
            return Err(BoardError::InvalidConfig(
                "notice_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(rest) = &self.rest {
            if rest.base_url.trim().is_empty() {
                return Err(BoardError::InvalidConfig(
                    "rest.base_url must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Confirmation timeout, or `None` when disabled.
    pub fn confirm_timeout(&self) -> Option<Duration> {
        (self.confirm_timeout_ms > 0).then(|| Duration::from_millis(self.confirm_timeout_ms))
    }

    /// Sets the confirmation timeout. `Duration::ZERO` disables it.
    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_activation_distance(mut self, distance: f64) -> Self {
        self.activation_distance = distance;
        self
    }

    pub fn with_fallback_error_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_error_message = message.into();
        self
    }

    pub fn with_notice_capacity(mut self, capacity: usize) -> Self {
        self.notice_capacity = capacity;
        self
    }

    pub fn with_rest(mut self, rest: RestConfig) -> Self {
        self.rest = Some(rest);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.confirm_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.activation_distance, 8.0);
        assert_eq!(config.fallback_error_message, "Failed to update deal stage");
        assert_eq!(config.notice_capacity, 32);
        assert!(config.rest.is_none());
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = BoardConfig::new().with_confirm_timeout(Duration::ZERO);
        assert_eq!(config.confirm_timeout(), None);
    }

    #[test]
    fn test_builder_pattern() {
        let config = BoardConfig::new()
            .with_confirm_timeout(Duration::from_millis(2500))
            .with_activation_distance(4.0)
            .with_fallback_error_message("Could not move deal")
            .with_notice_capacity(4);

        assert_eq!(config.confirm_timeout_ms, 2500);
        assert_eq!(config.activation_distance, 4.0);
        assert_eq!(config.fallback_error_message, "Could not move deal");
        assert_eq!(config.notice_capacity, 4);
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("board.toml");
        fs::write(
            &path,
            r#"
confirm_timeout_ms = 500
fallback_error_message = "Aşama güncellenemedi"

[rest]
base_url = "http://localhost:54321"
api_key = "anon-key"
"#,
        )
        .expect("write");

        let config = BoardConfig::load(Some(&path)).expect("load");

        assert_eq!(config.confirm_timeout_ms, 500);
        assert_eq!(config.fallback_error_message, "Aşama güncellenemedi");
        assert_eq!(config.activation_distance, 8.0);
        let rest = config.rest.expect("rest section");
        assert_eq!(rest.table, "deals");
        assert_eq!(rest.api_key, "anon-key");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("temp dir");
        let config =
            BoardConfig::load(Some(&temp_dir.path().join("absent.toml"))).expect("load");
        assert_eq!(config.notice_capacity, 32);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(BoardConfig::new()
            .with_activation_distance(-1.0)
            .validate()
            .is_err());
        assert!(BoardConfig::new()
            .with_activation_distance(f64::NAN)
            .validate()
            .is_err());
        assert!(BoardConfig::new().with_notice_capacity(0).validate().is_err());
    }
}
