//! # retail-pulse-server
//!
//! HTTP front end for the retail-pulse forecasting pipeline.

use retail_pulse::server::{self, ServerConfig};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    // Also forwards the library's `log` records.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retail_pulse=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.socket_addr()?;

    tracing::info!(
        "retail-pulse-server v{} listening on {} (max upload {} bytes, timeout {:?})",
        env!("CARGO_PKG_VERSION"),
        addr,
        config.max_upload_bytes,
        config.request_timeout
    );

    let listener = TcpListener::bind(addr).await?;
    server::serve(listener, &config).await?;

    Ok(())
}
