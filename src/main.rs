//! penacq - administrative penalty disclosure acquisition system.
//!
//! A tool for acquiring administrative-penalty announcements published by
//! a financial regulator's disclosure site and normalizing them into
//! structured records.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use penacq::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "penacq=info"
    } else {
        "penacq=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
