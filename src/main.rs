//! flv-pseudostream
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ routing ──▶ origin (files / upstream + cache)
//!                                                     │
//!     Client Response                                 ▼
//!     ◀────────────── response ◀── filter chain (flv_seek → accounting)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use flv_pseudostream::config::loader::load_config;
use flv_pseudostream::config::watcher::ConfigWatcher;
use flv_pseudostream::lifecycle::signals;
use flv_pseudostream::observability::{logging, metrics};
use flv_pseudostream::{HttpServer, ProxyConfig, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "flv-pseudostream", version, about = "FLV pseudo-streaming server")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if cli.check {
        println!("configuration ok");
        return Ok(());
    }

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        servers = config.servers.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "flv-pseudostream starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher handle alive for the lifetime of the server.
    let (_watcher, updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), Some(updates)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (None, None)
                }
            }
        }
        None => (None, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::trigger_on_signal(&signal_shutdown).await;
    });

    HttpServer::new(config).run(listener, updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
