//! Notification listener client.
//!
//! Connects to the notification server as a user and prints every message it
//! receives.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin teamup-client -- --user-id alice
//! cargo run --bin teamup-client -- --url ws://127.0.0.1:3003/ws --user-id alice
//! ```

use clap::Parser;
use teamup_client::runner::run_client;
use teamup_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "teamup-client")]
#[command(about = "Listen for real-time notifications as a user", long_about = None)]
struct Args {
    /// WebSocket endpoint of the notification server
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:3003/ws")]
    url: String,

    /// User id to listen as
    #[arg(short = 'i', long)]
    user_id: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run_client(&args.url, &args.user_id).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
