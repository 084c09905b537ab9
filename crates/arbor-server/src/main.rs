//! Arbor server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 127.0.0.1:8001, 30 second lock TTL
//! arbor-server
//!
//! # Custom bind address and a short lock lease
//! arbor-server --bind 0.0.0.0:8001 --lock-ttl-secs 10
//! ```

use std::time::Duration;

use arbor_server::{Server, ServerConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Arbor tree store server
#[derive(Parser, Debug)]
#[command(name = "arbor-server")]
#[command(about = "In-memory versioned tree store over HTTP")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8001")]
    bind: String,

    /// Seconds a lock survives without renewal
    #[arg(long, default_value = "30")]
    lock_ttl_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Arbor server starting");

    let config = ServerConfig {
        bind_address: args.bind,
        lock_ttl: Duration::from_secs(args.lock_ttl_secs),
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
