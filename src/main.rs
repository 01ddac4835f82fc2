use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refresh_proxy::config::{load_config, AuthConfig, ProcessEnv, ServerConfig};
use refresh_proxy::http::HttpServer;

/// Edge proxy for a browser app's refresh-token flow.
#[derive(Debug, Parser)]
#[command(name = "refresh-proxy", version)]
struct Args {
    /// Path to the TOML runtime configuration file. Defaults apply when
    /// omitted; auth settings always come from the environment.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refresh_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("refresh-proxy v0.1.0 starting");

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        static_assets_dir = %config.static_assets.dir,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Surface incomplete auth configuration at startup; handlers re-read the
    // environment per request, so this is a warning, not a hard failure.
    if let Err(missing) = AuthConfig::load(&ProcessEnv).ready() {
        tracing::warn!(
            missing = %missing,
            "Auth environment incomplete; proxy endpoints will return 500 until it is set"
        );
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            refresh_proxy::observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
