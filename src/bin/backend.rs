//! transgate Backend Simulator Binary
//!
//! Serves the line protocol locally so the gateway can be exercised without
//! the real backend.

use std::thread;
use std::time::Duration;

use clap::Parser;
use transgate::network::{echo_handler, Server};
use transgate::protocol::{Response, STATUS_DATABASE_ERROR};
use tracing_subscriber::{fmt, EnvFilter};

/// transgate Backend Simulator
#[derive(Parser, Debug)]
#[command(name = "transgate-backend")]
#[command(about = "Local simulator of the line-protocol backend")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:20005")]
    listen: String,

    /// Delay every response by this many milliseconds
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Answer every command with a database error carrying this message
    #[arg(long)]
    db_error: Option<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,transgate=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("transgate backend simulator v{}", transgate::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let delay = Duration::from_millis(args.delay_ms);
    let db_error = args.db_error.clone();

    let server = match Server::bind(&args.listen, move |command| {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        match &db_error {
            Some(message) => Response::default()
                .field("status", format!("{}:{}", STATUS_DATABASE_ERROR, message)),
            None => echo_handler(command),
        }
    }) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
