//! askdb MCP server binary.
//!
//! This binary runs the MCP server using stdio transport. Logs go to stderr
//! since stdout carries the protocol.

use askdb_mcp::AskdbMcpServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("askdb=info,askdb_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting askdb-mcp server");

    let server = AskdbMcpServer::new();
    server.discover_workspace(&std::env::current_dir()?).await;
    server.run().await?;

    Ok(())
}
