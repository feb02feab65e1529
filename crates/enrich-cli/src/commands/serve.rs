//! `enrich serve` - start the MCP server.

use anyhow::{Context, Result};
use enrich_core::Transport;
use enrich_mcp::McpServer;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn run(config_path: PathBuf, transport: Option<Transport>, port: Option<u16>) -> Result<()> {
    let (config, app) = super::load_app(&config_path)?;

    let mut mcp = config.mcp.clone();
    if !mcp.enabled {
        anyhow::bail!("MCP server is disabled in {:?} (mcp.enabled: false)", config_path);
    }
    if let Some(transport) = transport {
        mcp.transport = transport;
    }
    if let Some(port) = port {
        mcp.port = port;
    }

    // stdout is the protocol channel under stdio
    if mcp.is_http() {
        println!("\n🚀 Serving {} over HTTP", app.title());
        println!("   Endpoint: http://{}/mcp", mcp.address());
        println!("   Tools: {}", app.tools().len());
    }
    tracing::info!(
        title = %app.title(),
        transport = %mcp.transport,
        inlining_depth = config.inlining.max_depth,
        "Starting Enrich"
    );

    McpServer::new(Arc::new(app), mcp)
        .with_inlining(config.inlining)
        .run()
        .await
        .context("MCP server stopped with an error")
}
