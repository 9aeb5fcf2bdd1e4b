//! Docs Portal terminal client
//!
//! Chat with the engineering documentation backend from a terminal.

mod repl;

use docs_portal::{ClientConfig, ConversationStore, HealthMonitor, HttpEventSource, HttpHealthProbe};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (stderr, so the transcript on stdout stays clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docs_portal=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        health_interval_secs = config.health_interval.as_secs(),
        "Starting docs portal client"
    );

    let store = ConversationStore::spawn(HttpEventSource::new(&config)?);
    let health = HealthMonitor::spawn(HttpHealthProbe::new(&config)?, config.health_interval);

    let result = repl::run(store.clone(), health.subscribe()).await;

    store.shutdown().await;
    health.shutdown().await;
    tracing::info!("Docs portal client stopped");

    result?;
    Ok(())
}
