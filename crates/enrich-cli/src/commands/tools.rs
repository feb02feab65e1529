//! Tools introspection command.
//!
//! `enrich tools` - list the tools the MCP server would expose, offline.

use anyhow::{Context, Result};
use enrich_mcp::EnrichApp;
use std::path::PathBuf;

/// One line per tool: name, kind badge and first line of the description.
fn tool_lines(app: &EnrichApp) -> Vec<String> {
    app.tools()
        .names()
        .into_iter()
        .filter_map(|name| app.tools().get(name))
        .map(|entry| {
            let summary = entry
                .definition
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or("");
            format!("{} [{}] {}", entry.name(), entry.kind, summary)
        })
        .collect()
}

/// List tools for the configured model.
pub fn list(config_path: PathBuf, verbose: bool) -> Result<()> {
    let (_, app) = super::load_app(&config_path)?;

    println!("\n📦 {}", app.title());
    println!("   Entities: {}", app.entities().len());

    println!("\n🔧 Available Tools ({}):", app.tools().len());
    for line in tool_lines(&app) {
        println!("   • {}", line);
    }

    if verbose {
        println!("\n📋 Input Schemas:");
        for tool in app.list_tools() {
            let schema = serde_json::to_string_pretty(&tool.input_schema)
                .with_context(|| format!("Failed to render schema of {}", tool.name))?;
            println!("\n   {}:", tool.name);
            for line in schema.lines() {
                println!("      {}", line);
            }
        }
    }

    println!();
    Ok(())
}
