//! # Drive Harness CLI (`dctx`)
//!
//! Runs the scoped Drive search pipeline from the command line. Results are
//! printed to stdout as JSON; logs go to stderr and honour `RUST_LOG`.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dctx search --agent <id> "<query>"` | Sync the agent's scope and search it |
//! | `dctx scope --agent <id> "<query>"` | Print the resolved scope without fetching |
//! | `dctx check` | Report tool availability and the loaded configuration |
//!
//! ## Environment
//!
//! | Variable | Used by |
//! |----------|---------|
//! | `GOOGLE_DRIVE_CLIENT_ID`, `GOOGLE_DRIVE_CLIENT_SECRET` | tool availability |
//! | `GOOGLE_DRIVE_ACCESS_TOKEN` | Drive API requests |
//! | `INDEX_API_TOKEN` | index service requests (optional) |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use drive_harness::config::{self, GOOGLE_DRIVE_TOOL_ID};
use drive_harness::pipeline::{index_name, DrivePipeline};
use drive_harness::scope::{self, ConfigScopeStore, ScopeResolution, ScopeStore};
use drive_harness::traits::{DriveSearchTool, Tool, ToolContext, ToolRegistry};

/// Drive Harness CLI: scoped Google Drive retrieval for AI agents.
#[derive(Parser)]
#[command(name = "dctx", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dctx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the agent's Drive scope into its index and search it.
    Search {
        /// Agent whose scope and index are used.
        #[arg(long)]
        agent: String,

        /// The search query string.
        query: String,
    },

    /// Show how the agent's scope resolves, without calling Drive.
    Scope {
        #[arg(long)]
        agent: String,

        #[arg(default_value = "")]
        query: String,
    },

    /// Check credentials and print a configuration summary.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search { agent, query } => {
            if !DriveSearchTool::is_available() {
                anyhow::bail!(
                    "{} tool is unavailable: set GOOGLE_DRIVE_CLIENT_ID and GOOGLE_DRIVE_CLIENT_SECRET",
                    GOOGLE_DRIVE_TOOL_ID
                );
            }
            let pipeline = Arc::new(DrivePipeline::from_config(cfg)?);
            let mut tools = ToolRegistry::new();
            tools.register(Box::new(DriveSearchTool::new(pipeline)));

            let tool = tools
                .find(GOOGLE_DRIVE_TOOL_ID)
                .ok_or_else(|| anyhow::anyhow!("tool not registered: {}", GOOGLE_DRIVE_TOOL_ID))?;
            let output = tool
                .execute(json!({ "query": query }), &ToolContext::new(agent))
                .await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Scope { agent, query } => {
            let store = ConfigScopeStore::new(cfg.agents.clone());
            let artifacts = store.artifacts(&agent, GOOGLE_DRIVE_TOOL_ID).await?;
            let value = if artifacts.is_empty() {
                json!({ "agent": agent, "scope": "empty" })
            } else {
                let spec = scope::build_scope(&agent, &artifacts, &query)?;
                match scope::resolve(&spec, &cfg.source.mime_types)? {
                    ScopeResolution::Files(ids) => {
                        json!({ "agent": agent, "index": index_name(&agent), "files": ids })
                    }
                    ScopeResolution::Query(q) => {
                        json!({ "agent": agent, "index": index_name(&agent), "query": q })
                    }
                }
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Check => {
            let agents: Vec<_> = cfg
                .agents
                .iter()
                .map(|a| json!({ "id": a.id, "tool": a.tool, "artifacts": a.artifacts.len() }))
                .collect();
            let summary = json!({
                "tool": GOOGLE_DRIVE_TOOL_ID,
                "available": DriveSearchTool::is_available(),
                "drive_token": std::env::var("GOOGLE_DRIVE_ACCESS_TOKEN").is_ok(),
                "index": cfg.index.base_url,
                "staleness_window_secs": cfg.sync.staleness_window_secs,
                "search_limit": cfg.retrieval.search_limit,
                "download_concurrency": cfg.source.download_concurrency,
                "agents": agents,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
