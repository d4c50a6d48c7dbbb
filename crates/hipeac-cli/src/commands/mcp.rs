//! MCP command implementation.
//!
//! `hipeac mcp serve` runs the server; `hipeac mcp tools` prints what it
//! exposes without touching the database.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use hipeac_adapter_mysql::MySqlDirectoryStore;
use hipeac_core::{McpConfig, Transport};
use hipeac_directory::Directory;
use hipeac_mcp::{McpServer, ToolRegistry, resources};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// MCP-related commands.
#[derive(Debug, Args)]
pub struct McpCommand {
    #[command(subcommand)]
    pub command: McpSubcommand,
}

/// MCP subcommands.
#[derive(Debug, Subcommand)]
pub enum McpSubcommand {
    /// Start the MCP server.
    #[command(name = "serve")]
    Serve(McpServeArgs),

    /// Print the tools and resources the server exposes.
    #[command(name = "tools")]
    Tools(McpToolsArgs),
}

/// Arguments for `hipeac mcp serve`.
#[derive(Debug, Args)]
pub struct McpServeArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "hipeac.yaml")]
    pub config: PathBuf,

    /// Transport type (stdio or http). Overrides config file.
    #[arg(long)]
    pub transport: Option<Transport>,

    /// HTTP host (only for http transport). Overrides config file.
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port (only for http transport). Overrides config file.
    #[arg(long)]
    pub port: Option<u16>,
}

impl McpServeArgs {
    /// Apply command line overrides on top of the file configuration.
    fn apply(&self, config: &mut McpConfig) {
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}

/// Arguments for `hipeac mcp tools`.
#[derive(Debug, Args)]
pub struct McpToolsArgs {
    /// Show detailed tool schemas.
    #[arg(long)]
    pub verbose: bool,
}

/// Execute the MCP command.
pub async fn execute(cmd: McpCommand) -> Result<()> {
    match cmd.command {
        McpSubcommand::Serve(args) => execute_serve(args).await,
        McpSubcommand::Tools(args) => execute_tools(args),
    }
}

async fn execute_serve(args: McpServeArgs) -> Result<()> {
    let mut config = super::bootstrap(&args.config)?;
    args.apply(&mut config.mcp);

    info!(
        transport = ?config.mcp.transport,
        address = %config.mcp.bind_address(),
        env_credentials = config.upstream.uses_env_credentials(),
        "MCP configuration loaded"
    );

    let store = MySqlDirectoryStore::connect(&config.upstream)
        .await
        .context("Failed to connect to upstream database")?;

    let directory = Directory::new(Arc::new(store), config.directory.clone());
    let server = McpServer::new(config.mcp.clone(), Arc::new(directory));

    info!(tools = ?server.tools().names(), "Serving HiPEAC directory");
    server.run().await?;
    Ok(())
}

fn execute_tools(args: McpToolsArgs) -> Result<()> {
    let registry = ToolRegistry::with_directory_tools();

    println!("\n🔧 Tools ({}):", registry.len());
    for tool in registry.list() {
        println!("\n  {}", tool.name);
        if let Some(description) = &tool.description {
            println!("    {}", description);
        }
        if args.verbose {
            let schema = serde_json::to_string_pretty(&tool.input_schema)?;
            println!("    Input schema:");
            for line in schema.lines() {
                println!("      {}", line);
            }
        }
    }

    let resources = resources::list_resources();
    println!("\n📚 Resources ({}):", resources.len());
    for resource in &resources {
        println!("\n  {} ({})", resource.uri, resource.mime_type);
        if args.verbose
            && let Some(description) = &resource.description
        {
            println!("    {}", description);
        }
    }
    println!();

    Ok(())
}
