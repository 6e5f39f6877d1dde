//! Project configuration
//!
//! A project file selects what to render and how:
//!
//! ```toml
//! description = "sample stack"
//! scope = "things"
//! provider = "intrinsic"
//! indent = 2
//!
//! [loader]
//! mode = "fixed-point"
//! units = ["things/thing1.rdl", "things/thing2.rdl"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::loader::LoadMode;
use crate::template::{provider_by_name, Provider};

/// Errors that can occur when loading a project configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unknown provider '{0}' (expected json or intrinsic)")]
    UnknownProvider(String),
}

/// Loader section of a project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub mode: LoadMode,
    /// Explicit unit files, relative to the project directory; when empty
    /// every `*.rdl` file of the directory is loaded
    pub units: Vec<PathBuf>,
}

/// Render settings for one project
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub description: String,
    /// Restrict rendering to types defined in this unit or below it
    pub scope: Option<String>,
    pub provider: String,
    /// JSON indent width; 0 renders compact output
    pub indent: usize,
    pub loader: LoaderConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            description: String::new(),
            scope: None,
            provider: "json".to_string(),
            indent: 2,
            loader: LoaderConfig::default(),
        }
    }
}

impl ProjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.provider().map(|_| ())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_load_mode(mut self, mode: LoadMode) -> Self {
        self.loader.mode = mode;
        self
    }

    /// Instantiate the configured provider
    pub fn provider(&self) -> Result<Box<dyn Provider>, ConfigError> {
        provider_by_name(&self.provider)
            .ok_or_else(|| ConfigError::UnknownProvider(self.provider.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::from_str("").expect("empty config is valid");
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.loader.mode, LoadMode::FixedPoint);
        assert_eq!(config.indent, 2);
    }

    #[test]
    fn test_full_config() {
        let config = ProjectConfig::from_str(
            r#"
            description = "sample stack"
            scope = "things"
            provider = "intrinsic"
            indent = 0

            [loader]
            mode = "ordered"
            units = ["things/thing1.rdl"]
        "#,
        )
        .expect("Should parse");

        assert_eq!(config.description, "sample stack");
        assert_eq!(config.scope.as_deref(), Some("things"));
        assert_eq!(config.indent, 0);
        assert_eq!(config.loader.mode, LoadMode::Ordered);
        assert_eq!(config.loader.units, vec![PathBuf::from("things/thing1.rdl")]);
        assert_eq!(config.provider().map(|p| p.name().to_string()).ok(), Some("intrinsic".to_string()));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = ProjectConfig::from_str(r#"provider = "yaml""#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(name) if name == "yaml"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ProjectConfig::from_str(r#"colour = "red""#).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_builders() {
        let config = ProjectConfig::new()
            .with_description("d")
            .with_scope("s")
            .with_provider("cfn")
            .with_indent(4)
            .with_load_mode(LoadMode::Ordered);
        assert_eq!(config.scope.as_deref(), Some("s"));
        assert!(config.provider().is_ok());
        assert_eq!(config.loader.mode, LoadMode::Ordered);
    }
}
