//! System API endpoints.
//!
//! Provides the system status endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use evolv_bridge_core::{Backend, ChannelDialect, CHANNEL_NAME};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Creates the system router.
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// System status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "version": "0.1.0",
    "uptime_secs": 3600,
    "started_at_utc": "2025-01-15T04:30:00Z",
    "backend": "simulated",
    "dialect": "ios",
    "channel": "bluetooth_manager",
    "notification_subscribers": 1
}))]
pub struct SystemStatusResponse {
    /// Server version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Server uptime in seconds.
    #[schema(example = 3600)]
    pub uptime_secs: u64,

    /// When the server started (RFC 3339, UTC).
    #[schema(example = "2025-01-15T04:30:00Z")]
    pub started_at_utc: String,

    /// Bluetooth backend the bridge drives.
    #[schema(value_type = String, example = "simulated")]
    pub backend: Backend,

    /// Reply encoding on the channel: `ios` tokens or `macos` booleans.
    #[schema(value_type = String, example = "ios")]
    pub dialect: ChannelDialect,

    /// Name of the message channel.
    #[schema(example = "bluetooth_manager")]
    pub channel: String,

    /// Open notification streams.
    #[schema(example = 1)]
    pub notification_subscribers: usize,
}

/// Get system status.
#[utoipa::path(
    get,
    path = "/api/system/status",
    tag = "system",
    operation_id = "getSystemStatus",
    summary = "Get system status",
    description = "Returns server version, uptime, the Bluetooth backend and channel dialect \
        in use, and how many clients are listening for notifications. Does not query the \
        Bluetooth adapter; use the `getBluetoothStatus` channel method for that.",
    responses(
        (status = 200, description = "System status", body = SystemStatusResponse)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatusResponse> {
    let bridge = state.bridge();
    Json(SystemStatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        started_at_utc: state.started_at().to_rfc3339(),
        backend: state.backend(),
        dialect: bridge.dialect(),
        channel: CHANNEL_NAME.to_string(),
        notification_subscribers: bridge.subscriber_count(),
    })
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use evolv_bridge_core::{BridgeService, SimulatedRadio};

    use super::*;

    #[tokio::test]
    async fn test_status_reports_bridge_settings() {
        let bridge = BridgeService::spawn(SimulatedRadio::default(), ChannelDialect::Macos);
        let _subscriber = bridge.subscribe();
        let server =
            TestServer::new(crate::api::create_router(AppState::new(bridge, Backend::Simulated)))
                .unwrap();

        let response = server.get("/api/system/status").await;
        response.assert_status_ok();
        let status = response.json::<SystemStatusResponse>();
        assert_eq!(status.dialect, ChannelDialect::Macos);
        assert_eq!(status.backend, Backend::Simulated);
        assert_eq!(status.channel, "bluetooth_manager");
        assert_eq!(status.notification_subscribers, 1);
        assert!(chrono::DateTime::parse_from_rfc3339(&status.started_at_utc).is_ok());
    }
}
