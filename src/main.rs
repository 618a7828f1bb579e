//! Uptime Console Binary

use clap::Parser;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uptime_console::{
    ApiClient, Cli, Config, Console, DetailCache, FileIdentityStore, IdentityGate,
    MonitorListCache, MutationPipeline, Result,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    initialize_tracing();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let code = match run(config, cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Console failed to start: {}", e);
            1
        }
    };

    std::process::exit(code);
}

async fn run(config: Config, cli: Cli) -> Result<i32> {
    let store = Box::new(FileIdentityStore::new(&config.identity_path));
    let identity = Arc::new(IdentityGate::load(store).await?);

    let client = ApiClient::new(&config, identity.clone())?;
    let list = MonitorListCache::new(client.clone(), config.poll_interval);
    let details = DetailCache::new(client.clone(), config.detail_ttl);
    let pipeline = MutationPipeline::new(client, identity.clone(), list.clone());

    let console = Console::new(identity, list, details, pipeline);
    Ok(console.run(cli.command).await)
}

/// Initialize structured logging
///
/// Logs go to stderr so command output on stdout stays clean.
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
