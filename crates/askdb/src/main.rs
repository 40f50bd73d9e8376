//! askdb CLI binary.

use anyhow::Result;
use askdb::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the askdb CLI.
///
/// A current-thread runtime is enough: commands run one request at a time.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Controlled via RUST_LOG, e.g. RUST_LOG=askdb=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("askdb=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting askdb CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("askdb CLI completed successfully");
    Ok(())
}
