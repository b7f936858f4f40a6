//! `hexhaven [config.json]`
//!
//! Logging is controlled by `RUST_LOG` (default `info`). The bind address
//! can be overridden with `HEXHAVEN_BIND`.

use std::path::PathBuf;

use hexhaven::{HexhavenError, HexhavenServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), HexhavenError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())?;

    let server = HexhavenServer::builder().config(config).build().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
}
