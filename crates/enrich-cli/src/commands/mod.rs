//! CLI command implementations for the Enrich MCP server.

pub mod check;
pub mod describe;
pub mod serve;
pub mod tools;

use anyhow::{Context, Result};
use enrich_core::EnrichConfig;
use enrich_mcp::{EnrichApp, MemoryStore, include_models};
use std::path::Path;
use std::sync::Arc;

/// Load the configuration file, resolving model and data paths against its
/// directory.
pub fn load_config(config_path: &Path) -> Result<EnrichConfig> {
    EnrichConfig::load_with_context(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))
}

/// Build the application described by `config` without running the
/// startup checks.
pub fn build_app(config: &EnrichConfig) -> Result<EnrichApp> {
    let model = config.load_model().with_context(|| {
        format!("Failed to load model file {:?}", config.model_file)
    })?;

    let store = match config
        .load_data()
        .with_context(|| format!("Failed to load data file {:?}", config.data_file))?
    {
        Some(data) => MemoryStore::from_json(data).context("Invalid data file")?,
        None => MemoryStore::new(),
    };

    let mut app = EnrichApp::new(config.title.clone(), config.instructions.clone());
    include_models(&mut app, &model, Arc::new(store)).context("Failed to register model")?;
    Ok(app)
}

/// Load configuration and build a finalized application.
pub fn load_app(config_path: &Path) -> Result<(EnrichConfig, EnrichApp)> {
    let config = load_config(config_path)?;
    let mut app = build_app(&config)?;
    app.finalize().context("Startup checks failed")?;
    Ok((config, app))
}
