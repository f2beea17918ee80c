//! Harness configuration

use crate::error::LoadError;
use atk_core::MethodTag;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Log output format of the `atk` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,

    /// One JSON object per event
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `atk_runtime=debug`
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Namespace scanned when a scenario names none
    pub default_namespace: String,

    /// Method variant expectations use when a scenario names none
    pub default_method: MethodTag,

    /// Fail the run when the pipeline swallowed an unmatched call
    pub fail_on_swallowed_unmatched: bool,

    /// Refuse to verify expectations before a pipeline run
    pub require_prior_run: bool,

    /// Logging settings
    pub log: LogConfig,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default namespace
    #[inline]
    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// With default expectation method
    #[inline]
    #[must_use]
    pub fn with_default_method(mut self, method: MethodTag) -> Self {
        self.default_method = method;
        self
    }

    /// With swallowed-unmatched policy
    #[inline]
    #[must_use]
    pub fn with_fail_on_swallowed_unmatched(mut self, fail: bool) -> Self {
        self.fail_on_swallowed_unmatched = fail;
        self
    }

    /// With prior-run requirement
    #[inline]
    #[must_use]
    pub fn with_require_prior_run(mut self, require: bool) -> Self {
        self.require_prior_run = require;
        self
    }

    /// With log settings
    #[inline]
    #[must_use]
    pub fn with_log(mut self, level: impl Into<String>, format: LogFormat) -> Self {
        self.log = LogConfig {
            level: level.into(),
            format,
        };
        self
    }

    /// Parse from TOML text; missing keys keep their defaults
    ///
    /// # Errors
    /// `LoadError::Toml` on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, LoadError> {
        toml::from_str(text).map_err(|source| LoadError::Toml {
            origin: "<inline>".to_string(),
            source,
        })
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `LoadError::Io` if the file cannot be read, `LoadError::Toml` if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| LoadError::Toml {
            origin: path.display().to_string(),
            source,
        })
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_namespace: "orchestrator".to_string(),
            default_method: MethodTag::Invoke,
            fail_on_swallowed_unmatched: true,
            require_prior_run: true,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn config_default() {
        let config = HarnessConfig::default();
        assert_eq!(config.default_namespace, "orchestrator");
        assert_eq!(config.default_method, MethodTag::Invoke);
        assert!(config.fail_on_swallowed_unmatched);
        assert!(config.require_prior_run);
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn config_builder() {
        let config = HarnessConfig::new()
            .with_default_namespace("demo.prompt")
            .with_default_method(MethodTag::Batch)
            .with_fail_on_swallowed_unmatched(false)
            .with_log("debug", LogFormat::Json);
        assert_eq!(config.default_namespace, "demo.prompt");
        assert_eq!(config.default_method, MethodTag::Batch);
        assert!(!config.fail_on_swallowed_unmatched);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml_str(
            r#"
            default_namespace = "demo.batch"
            default_method = "batch"

            [log]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_namespace, "demo.batch");
        assert_eq!(config.default_method, MethodTag::Batch);
        assert!(config.require_prior_run);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = HarnessConfig::from_toml_str("default_method = \"stream\"").unwrap_err();
        assert!(matches!(err, LoadError::Toml { .. }));
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "require_prior_run = false").unwrap();
        let config = HarnessConfig::from_file(file.path()).unwrap();
        assert!(!config.require_prior_run);

        let missing = HarnessConfig::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(LoadError::Io { .. })));
    }
}
