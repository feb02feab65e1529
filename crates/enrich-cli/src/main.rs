//! `enrich` - serve an entity model to agents over MCP.

mod commands;

use clap::{Parser, Subcommand};
use enrich_core::Transport;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "enrich", version, about = "Enrich CLI")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, short = 'c', global = true, env = "ENRICH_CONFIG", default_value = "enrich.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server for the configured model.
    Serve {
        /// Override the configured transport (stdio or http).
        #[arg(long)]
        transport: Option<Transport>,

        /// Override the configured HTTP port.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration, the model and resolver coverage.
    Check,

    /// Print the data model description.
    Describe {
        /// Emit the structured description as JSON instead of markdown.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the tools the server would expose.
    Tools {
        /// Show input schemas.
        #[arg(long, short = 'v', default_value_t = false)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout belongs to the stdio transport, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { transport, port } => {
            commands::serve::run(cli.config, transport, port).await?;
        }
        Command::Check => {
            commands::check::run(cli.config)?;
        }
        Command::Describe { json } => {
            commands::describe::run(cli.config, json)?;
        }
        Command::Tools { verbose } => {
            commands::tools::list(cli.config, verbose)?;
        }
    }

    Ok(())
}
