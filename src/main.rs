use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use news_gateway::config::loader::load_or_default;
use news_gateway::http::HttpServer;
use news_gateway::lifecycle::{connect, serve_until, signals, Shutdown};
use news_gateway::observability::{logging, metrics};

/// How long in-flight requests and reply pumps get to finish after a signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// HTTP gateway in front of the news and comments services.
#[derive(Debug, Parser)]
#[command(name = "news-gateway", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "NEWS_GATEWAY_CONFIG", default_value = "config/gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "news-gateway starting");
    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        broker = ?config.broker.kind,
        round_trip_secs = config.timeouts.round_trip_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pumps = Shutdown::new();
    let bridge = connect(&config, &pumps)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, Arc::new(bridge));
    let stop = async {
        if let Err(e) = signals::wait_for_shutdown().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signals");
        }
    };
    if let Err(e) = serve_until(server, listener, stop, &pumps, SHUTDOWN_GRACE).await {
        tracing::error!(error = %e, "HTTP server failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
