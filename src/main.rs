//! Transfer monitor server
//!
//! Run with: cargo run -- --rpc-url https://... --token-address 0x...
//!
//! Every transfer field can also come from the environment or a `.env` file.

use clap::Parser;
use revert_watch::{RpcConnector, ServerConfig, TransferDefaults};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "revert-watch", version, about)]
struct Cli {
    #[command(flatten)]
    server: ServerConfig,

    #[command(flatten)]
    defaults: TransferDefaults,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment before clap reads env fallbacks
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    revert_watch::server::serve(RpcConnector, cli.server, cli.defaults).await
}
