//! Message-channel endpoints.
//!
//! The shell talks to the bridge over one named channel:
//! - `POST /api/channels/{channel}/invoke` carries a method call and its reply
//! - `GET /api/channels/{channel}/events` streams notifications as Server-Sent Events

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use evolv_bridge_core::{MethodCall, MethodResponse, Notification, CHANNEL_NAME};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Creates the channel router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{channel}/invoke", post(invoke))
        .route("/{channel}/events", get(events))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A method call on the channel.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "method": "startScanning"
}))]
pub struct InvokeRequest {
    /// Method name, e.g. `getBluetoothStatus` or `startScanning`.
    #[schema(example = "startScanning")]
    pub method: String,

    /// Call arguments. Accepted for compatibility; no method uses them.
    #[serde(default)]
    #[schema(value_type = Option<Object>, nullable)]
    pub arguments: Option<serde_json::Value>,
}

/// Reply to a method call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "method": "startScanning",
    "result": "scanning_started"
}))]
pub struct InvokeResponse {
    /// The method that was called.
    #[schema(example = "startScanning")]
    pub method: String,

    /// A string token, or a boolean in the `macos` dialect.
    #[schema(value_type = Object, example = "scanning_started")]
    pub result: serde_json::Value,
}

// ============================================================================
// Handlers
// ============================================================================

fn ensure_channel(channel: &str) -> ApiResult<()> {
    if channel == CHANNEL_NAME {
        Ok(())
    } else {
        Err(ApiError::NotFound {
            error_code: "unknown_channel".to_string(),
            message: format!("No channel named '{channel}'; this bridge serves '{CHANNEL_NAME}'"),
        })
    }
}

/// Invoke a bridge method.
///
/// Expected negative outcomes, like `bluetooth_not_available`, are normal
/// replies. Only an unrecognized method is an error.
#[utoipa::path(
    post,
    path = "/api/channels/{channel}/invoke",
    tag = "channel",
    operation_id = "invokeMethod",
    summary = "Invoke a bridge method",
    description = "Sends one method call to the Bluetooth bridge and returns its reply. \
        Supported methods: getBluetoothStatus, getBluetoothState, getBluetoothPermissionStatus, \
        requestBluetoothPermission, isBluetoothEnabled, startScanning, stopScanning. \
        The first call that needs the Bluetooth adapter creates the platform handle, so the \
        first state query may report `unknown` until the adapter reports in.",
    params(
        ("channel" = String, Path, description = "Channel name; must be `bluetooth_manager`")
    ),
    request_body = InvokeRequest,
    responses(
        (status = 200, description = "Method ran", body = InvokeResponse),
        (status = 400, description = "Malformed request body", body = crate::api::error::ErrorResponse),
        (status = 404, description = "Unknown channel", body = crate::api::error::ErrorResponse),
        (status = 501, description = "Method not implemented", body = crate::api::error::ErrorResponse),
        (status = 503, description = "Bridge stopped", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn invoke(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    payload: Result<Json<InvokeRequest>, JsonRejection>,
) -> ApiResult<Json<InvokeResponse>> {
    ensure_channel(&channel)?;
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest {
        error_code: "invalid_request".to_string(),
        message: rejection.body_text(),
    })?;

    let call = MethodCall {
        method: request.method.clone(),
        arguments: request.arguments.unwrap_or_default(),
    };

    match state.bridge().invoke(call).await? {
        MethodResponse::Success(reply) => Ok(Json(InvokeResponse {
            method: request.method,
            result: reply.to_value(),
        })),
        MethodResponse::NotImplemented => Err(ApiError::MethodNotImplemented {
            method: request.method,
        }),
    }
}

/// Stream bridge notifications.
#[utoipa::path(
    get,
    path = "/api/channels/{channel}/events",
    tag = "channel",
    operation_id = "streamNotifications",
    summary = "Stream bridge notifications",
    description = "Server-Sent Events stream of unsolicited bridge messages. The SSE event name \
        is the notification method (`onBluetoothStateChanged` or `onDeviceDiscovered`) and the \
        data is `{\"method\": ..., \"arguments\": ...}`. State changes are sent on every adapter \
        report, including repeats. Every advertisement from a device whose name contains \
        `evolv28` is sent; there is no de-duplication.",
    params(
        ("channel" = String, Path, description = "Channel name; must be `bluetooth_manager`")
    ),
    responses(
        (status = 200, description = "Notification stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown channel", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn events(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    ensure_channel(&channel)?;

    let receiver = state.bridge().subscribe();
    info!(
        subscribers = state.bridge().subscriber_count(),
        "Notification subscriber connected"
    );

    Ok(Sse::new(notification_stream(receiver)).keep_alive(KeepAlive::default()))
}

/// Turn a notification subscription into SSE events.
///
/// A lagging subscriber skips what it missed rather than disconnecting.
fn notification_stream(
    receiver: broadcast::Receiver<Notification>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => match notification_event(&notification) {
                    Some(event) => return Some((Ok(event), receiver)),
                    None => continue,
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

/// Encode one notification as an SSE event.
pub fn notification_event(notification: &Notification) -> Option<Event> {
    match Event::default()
        .event(notification.method_name())
        .json_data(notification)
    {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "Failed to encode notification");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use evolv_bridge_core::{
        AdapterState, Backend, BridgeService, ChannelDialect, DiscoveredDevice, SimulatedRadio,
    };
    use futures::StreamExt;
    use serde_json::{json, Value};

    use super::*;

    fn server(radio: SimulatedRadio, dialect: ChannelDialect) -> TestServer {
        let bridge = BridgeService::spawn(radio, dialect);
        let state = AppState::new(bridge, Backend::Simulated);
        TestServer::new(crate::api::create_router(state)).unwrap()
    }

    async fn call(server: &TestServer, method: &str) -> Value {
        let response = server
            .post("/api/channels/bluetooth_manager/invoke")
            .json(&json!({ "method": method }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["result"].clone()
    }

    #[tokio::test]
    async fn test_invoke_returns_tokens() {
        let radio = SimulatedRadio::new(AdapterState::PoweredOff);
        let server = server(radio, ChannelDialect::Ios);

        // The handle is created by this call; its state report arrives after.
        assert_eq!(call(&server, "getBluetoothStatus").await, json!("unknown"));
        assert_eq!(call(&server, "getBluetoothStatus").await, json!("powered_off"));
        assert_eq!(
            call(&server, "getBluetoothPermissionStatus").await,
            json!("granted_but_off")
        );
        assert_eq!(
            call(&server, "startScanning").await,
            json!("bluetooth_not_available")
        );
        assert_eq!(call(&server, "stopScanning").await, json!("scanning_stopped"));
        assert_eq!(
            call(&server, "requestBluetoothPermission").await,
            json!("permission_requested")
        );
    }

    #[tokio::test]
    async fn test_invoke_in_macos_dialect_returns_flags() {
        let radio = SimulatedRadio::new(AdapterState::PoweredOn);
        let server = server(radio, ChannelDialect::Macos);

        call(&server, "getBluetoothState").await;
        assert_eq!(call(&server, "isBluetoothEnabled").await, json!(true));
        assert_eq!(call(&server, "startScanning").await, json!(true));
        assert_eq!(call(&server, "stopScanning").await, json!(true));
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_implemented() {
        let radio = SimulatedRadio::new(AdapterState::PoweredOn);
        let server = server(radio.clone(), ChannelDialect::Ios);

        let response = server
            .post("/api/channels/bluetooth_manager/invoke")
            .json(&json!({ "method": "connectDevice", "arguments": {"id": "x"} }))
            .await;
        response.assert_status(StatusCode::NOT_IMPLEMENTED);
        let body = response.json::<Value>();
        assert_eq!(body["error"], "method_not_implemented");
        assert_eq!(body["details"]["method"], "connectDevice");
        assert_eq!(radio.handles_created(), 0);
    }

    #[tokio::test]
    async fn test_unknown_channel_is_not_found() {
        let server = server(SimulatedRadio::default(), ChannelDialect::Ios);
        let response = server
            .post("/api/channels/wifi_manager/invoke")
            .json(&json!({ "method": "getBluetoothStatus" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["error"], "unknown_channel");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let server = server(SimulatedRadio::default(), ChannelDialect::Ios);
        let response = server
            .post("/api/channels/bluetooth_manager/invoke")
            .json(&json!({ "command": "getBluetoothStatus" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_notification_stream_yields_every_notification() {
        let (sender, receiver) = broadcast::channel(8);
        let mut stream = Box::pin(notification_stream(receiver));

        let device = Notification::DeviceDiscovered(DiscoveredDevice {
            id: "a".to_string(),
            name: "Evolv28".to_string(),
            rssi: -50,
        });
        sender.send(device.clone()).unwrap();
        sender.send(device).unwrap();
        drop(sender);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_invoke_request_arguments_are_optional() {
        let request: InvokeRequest =
            serde_json::from_value(json!({ "method": "stopScanning" })).unwrap();
        assert_eq!(request.method, "stopScanning");
        assert!(request.arguments.is_none());
    }
}
