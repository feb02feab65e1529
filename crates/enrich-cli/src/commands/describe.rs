//! `enrich describe` - print the data model.

use anyhow::{Context, Result};
use std::path::PathBuf;

pub fn run(config_path: PathBuf, json: bool) -> Result<()> {
    let (_, app) = super::load_app(&config_path)?;

    if json {
        let description = app.describe_model_struct();
        let rendered = serde_json::to_string_pretty(&description)
            .context("Failed to serialize model description")?;
        println!("{}", rendered);
    } else {
        println!("{}", app.describe_model());
    }
    Ok(())
}
