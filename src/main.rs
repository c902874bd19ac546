//! imap-data-access - command line access to the IMAP Science Data Center.

use imap_data_access::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = match cli::verbosity() {
        cli::Verbosity::Debug => "imap_data_access=debug",
        cli::Verbosity::Verbose => "imap_data_access=info",
        cli::Verbosity::Quiet => "imap_data_access=warn",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::run().await
}
