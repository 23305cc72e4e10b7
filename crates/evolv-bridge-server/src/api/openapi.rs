//! OpenAPI specification generation for the evolv bridge API.
//!
//! Descriptions are written for whoever wires an application shell to the
//! bridge: they name the channel methods and the tokens each one returns.

use axum::Json;
use evolv_bridge_core::{AdapterState, Backend, ChannelDialect, DiscoveredDevice, PermissionState};
use utoipa::OpenApi;

use super::channel::{InvokeRequest, InvokeResponse};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::system::SystemStatusResponse;

/// Serve the OpenAPI specification as JSON.
///
/// Available at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty JSON.
/// Used by the gen-openapi binary.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for the bridge.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "evolv bridge API",
        version = "0.1.0",
        description = r#"
# evolv bridge API

Hosts the `bluetooth_manager` message channel that an application shell uses to
query the Bluetooth adapter, scan for Evolv28 devices, and hear about adapter
state changes.

## Methods

Invoke with `POST /api/channels/bluetooth_manager/invoke`:

| method | ios reply | macos reply |
|---|---|---|
| `getBluetoothStatus`, `getBluetoothState` | adapter state token | adapter state token |
| `getBluetoothPermissionStatus` | permission token | permission token |
| `requestBluetoothPermission` | `permission_requested` | `true` when powered on |
| `isBluetoothEnabled` | `true` when powered on | `true` when powered on |
| `startScanning` | `scanning_started` or `bluetooth_not_available` | `true` or `false` |
| `stopScanning` | `scanning_stopped` | `true` |

Any other method is answered with 501 `method_not_implemented`.

## Notifications

`GET /api/channels/bluetooth_manager/events` streams `onBluetoothStateChanged`
on every adapter report and `onDeviceDiscovered` for every advertisement whose
name contains `evolv28` (case-insensitive).
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local evolv bridge")
    ),
    tags(
        (
            name = "system",
            description = "Health checks and system status"
        ),
        (
            name = "channel",
            description = "The bluetooth_manager message channel: method calls and notifications"
        )
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Channel endpoints
        super::channel::invoke,
        super::channel::events,
        // System endpoints
        super::system::get_status,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Channel types
            InvokeRequest,
            InvokeResponse,
            AdapterState,
            PermissionState,
            DiscoveredDevice,
            // System types
            SystemStatusResponse,
            Backend,
            ChannelDialect,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "evolv bridge API");
        assert!(spec.paths.paths.contains_key("/api/channels/{channel}/invoke"));
        assert!(spec.paths.paths.contains_key("/api/channels/{channel}/events"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"evolv bridge API\""));
        assert!(json.contains("invokeMethod"));
    }
}
