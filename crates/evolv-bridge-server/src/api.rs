//! HTTP API routes and handlers.
//!
//! - `channel` - The `bluetooth_manager` method channel and its notification stream
//! - `health` - Service health checks
//! - `system` - Server status
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod channel;
pub mod error;
pub mod health;
pub mod openapi;
pub mod system;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                          - Health check
/// /api
/// ├── /channels/{channel}/invoke   - Method call
/// ├── /channels/{channel}/events   - Notification stream (SSE)
/// ├── /system/status               - Server status
/// └── /openapi.json                - OpenAPI specification
/// /swagger-ui                      - Interactive documentation
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest(
            "/api",
            Router::new()
                // OpenAPI spec at /api/openapi.json
                .route("/openapi.json", get(openapi::get_openapi_spec))
                // Message channel
                .nest("/channels", channel::router())
                // System management
                .nest("/system", system::router()),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
