//! LedgerKV Server Binary
//!
//! Starts the TCP server for LedgerKV.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ledgerkv::network::Server;
use ledgerkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// LedgerKV Server
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-server")]
#[command(about = "Embedded append-only key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./ledgerkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Segment size in MB above which the command log is rotated
    #[arg(short, long, default_value = "10")]
    segment_mb: u64,

    /// Seconds between rotation checks
    #[arg(short, long, default_value = "5")]
    rotation_secs: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledgerkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LedgerKV Server v{}", ledgerkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .segment_size_limit(args.segment_mb * 1024 * 1024)
        .rotation_interval(Duration::from_secs(args.rotation_secs))
        .build();

    // Open engine (recovery runs before any connection is accepted)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
    }
    tracing::info!("Server stopped");
}
