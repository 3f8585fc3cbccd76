//! Configuration management for the loader
//!
//! Handles configuration loading (JSON or TOML) and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Foreign declaration adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Leading dependency entries reserved by the foreign compiler
    /// (`require`, `exports`), stripped before registration
    #[serde(default = "default_reserved_dependencies")]
    pub reserved_dependencies: usize,

    /// Relative path marker removed from the start of dependency names
    #[serde(default = "default_relative_prefix")]
    pub relative_prefix: String,
}

fn default_reserved_dependencies() -> usize {
    2
}

fn default_relative_prefix() -> String {
    "./".to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            reserved_dependencies: default_reserved_dependencies(),
            relative_prefix: default_relative_prefix(),
        }
    }
}

/// Declarative trigger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Markup attribute naming an entry point to run
    #[serde(default = "default_trigger_attribute")]
    pub attribute: String,
}

fn default_trigger_attribute() -> String {
    "data-hr-run".to_string()
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            attribute: default_trigger_attribute(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "deferred_loader=debug"); RUST_LOG wins
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Loader configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub adapter: AdapterConfig,

    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Runner blockers installed when the loader is built
    #[serde(default)]
    pub runner_blockers: Vec<String>,

    pub logging: Option<LoggingConfig>,
}

impl LoaderConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path)?,
            Some("toml") => Self::from_toml_file(path)?,
            other => {
                return Err(anyhow::anyhow!(
                    "Unsupported config format {:?} for {}; use .json or .toml",
                    other,
                    path.display()
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let attribute = &self.triggers.attribute;
        if attribute.is_empty() {
            return Err(anyhow::anyhow!("Trigger attribute cannot be empty"));
        }
        if attribute
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>'))
        {
            return Err(anyhow::anyhow!(
                "Trigger attribute {:?} is not a valid attribute name",
                attribute
            ));
        }
        if let Some(blocker) = self.runner_blockers.iter().find(|b| b.is_empty()) {
            return Err(anyhow::anyhow!("Runner blocker tokens cannot be empty ({:?})", blocker));
        }
        Ok(())
    }
}
