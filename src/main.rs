use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;

use tipscribe_ratelimit::config::TipscribeConfig;
use tipscribe_ratelimit::grpc::GrpcServer;
use tipscribe_ratelimit::logging;
use tipscribe_ratelimit::ratelimit::{spawn_sweeper, SystemClock};

/// Per-client fixed-window admission service for the TipScribe backend.
#[derive(Parser, Debug)]
#[command(name = "tipscribe-ratelimit", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the gRPC listen address
    #[arg(long)]
    grpc_addr: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = TipscribeConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.grpc_addr {
        config.server.grpc_addr = addr;
    }
    if args.log_json {
        config.logging.json = true;
    }

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init(&config.logging);

    info!("Starting TipScribe admission service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(grpc_addr = %config.server.grpc_addr, "Configuration loaded");

    let limiters = Arc::new(config.build_limiters(Arc::new(SystemClock))?);
    info!(policies = limiters.len(), "Rate limiters initialized");

    let sweeper = config
        .rate_limiting
        .sweep_interval()
        .map(|interval| spawn_sweeper(limiters.clone(), interval));

    let grpc_server = GrpcServer::new(config.server.grpc_addr, limiters);

    // Run the server with graceful shutdown on Ctrl+C
    let result = grpc_server.serve_with_shutdown(shutdown_signal()).await;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    result?;
    info!("TipScribe admission service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
