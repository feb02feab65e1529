//! Configuration types for Enrich.
//!
//! Configuration is loaded from a single file (`enrich.yaml` or
//! `enrich.toml`) that names the application, selects the MCP transport,
//! tunes inlining and points at the model and data files.
//!
//! # Configuration Files
//!
//! - **enrich.yaml**: title, instructions, transport and inlining settings
//! - **model.yaml**: entity declarations (see [`ModelFile`])
//! - **data.json**: fixture rows keyed by entity name

pub mod mcp;
pub mod model_file;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use mcp::{McpConfig, Transport};
pub use model_file::{EntitySpec, FieldSpec, JoinSpec, ModelFile, RelationshipSpec};

/// Complete Enrich configuration loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Application title, shown to agents and used in tool names.
    #[serde(default = "default_title")]
    pub title: String,

    /// Instructions for interacting with the API.
    #[serde(default)]
    pub instructions: String,

    /// MCP server configuration.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Relationship inlining applied to retrieve results.
    #[serde(default)]
    pub inlining: InliningConfig,

    /// Path to the model file, relative to the configuration file.
    #[serde(default)]
    pub model_file: Option<PathBuf>,

    /// Path to the JSON data file, relative to the configuration file.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            instructions: String::new(),
            mcp: McpConfig::default(),
            inlining: InliningConfig::default(),
            model_file: None,
            data_file: None,
        }
    }
}

/// Inlining settings for retrieve tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InliningConfig {
    /// Maximum relationship depth to expand.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Only expand relationships flagged `inline`.
    #[serde(default = "default_true")]
    pub only_inline: bool,
}

impl Default for InliningConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            only_inline: true,
        }
    }
}

fn default_title() -> String {
    "Enrich".to_string()
}

fn default_max_depth() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnrichConfig {
    /// Load configuration from a file. `.toml` files are parsed as TOML,
    /// everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if path.extension().is_some_and(|e| e == "toml") {
            Self::from_toml(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Parse configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and make the model and data paths absolute with
    /// respect to the configuration file's directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        config.model_file = config.model_file.map(|p| resolve(&base_dir, p));
        config.data_file = config.data_file.map(|p| resolve(&base_dir, p));

        Ok(config)
    }

    /// Load the model file named by this configuration.
    pub fn load_model(&self) -> Result<ModelFile, ConfigError> {
        let path = self
            .model_file
            .as_ref()
            .ok_or_else(|| ConfigError::Config("model_file is not set".to_string()))?;
        ModelFile::from_file(path)
    }

    /// Load the data file named by this configuration, if any.
    pub fn load_data(&self) -> Result<Option<serde_json::Value>, ConfigError> {
        match &self.data_file {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                Ok(Some(serde_json::from_str(&content)?))
            }
            None => Ok(None),
        }
    }
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
