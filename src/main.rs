use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use append_file_mcp::{AppendFileTool, McpServer, ToolRegistry};

#[derive(Parser)]
#[command(name = "append-file-mcp", version)]
#[command(
    about = "MCP server that appends text to files, keeping appended content on its own line",
    long_about = None
)]
struct Cli {
    /// Enable verbose output (logs go to stderr)
    #[arg(short, long)]
    verbose: bool,
}

/// `--verbose` forces debug; otherwise `RUST_LOG` applies, defaulting to info.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }

    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    // stdout carries protocol frames
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

fn create_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(AppendFileTool);
    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let server = McpServer::new(create_tool_registry());
    info!(
        name = %server.info().name,
        version = %server.info().version,
        "append_file MCP Server running on stdio"
    );

    if let Err(e) = server.run().await.context("stdio transport failed") {
        error!(error = %format!("{:#}", e), "fatal error in server loop");
        std::process::exit(1);
    }

    Ok(())
}
