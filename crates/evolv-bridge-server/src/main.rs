//! # evolv-bridge-server
//!
//! Hosts the `bluetooth_manager` message channel over HTTP:
//! - Method calls via `POST /api/channels/bluetooth_manager/invoke`
//! - Notifications via Server-Sent Events
//! - OpenAPI documentation via Swagger UI
//!
//! ## Running
//!
//! ```bash
//! # Development, simulated adapter
//! cargo run --package evolv-bridge-server
//!
//! # BlueZ adapter on Linux
//! EVOLV_BRIDGE__BLUETOOTH__BACKEND=bluez \
//!     cargo run --package evolv-bridge-server --features bluetooth
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use anyhow::Context;
use evolv_bridge_core::Config;
use evolv_bridge_server::state::AppState;
use evolv_bridge_server::{api, backend, logging};
use tokio::net::TcpListener;
use tracing::info;

/// Overrides the configuration file location.
const CONFIG_PATH_ENV: &str = "EVOLV_BRIDGE_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    logging::init(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.bluetooth.backend,
        dialect = %config.bluetooth.dialect,
        "Starting evolv-bridge-server"
    );

    let bridge = backend::start_bridge(&config.bluetooth)?;
    let app = api::create_router(AppState::new(bridge, config.bluetooth.backend));

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
