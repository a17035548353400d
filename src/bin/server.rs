//! Two-player game relay server.
//!
//! Pairs clients into rooms over WebSocket and fans game events out between
//! them.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server
//! cargo run --bin server -- --host 0.0.0.0 --port 3000
//! ```

use clap::Parser;
use duo_relay::{common::logger::setup_logger, server::run_server};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "WebSocket relay server for two-player sessions", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to (defaults to $PORT, then 8080)
    #[arg(short = 'p', long, default_value_t = default_port())]
    port: u16,
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    if let Err(e) = run_server(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
