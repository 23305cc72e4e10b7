//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use evolv_bridge_core::BridgeError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 501 Not Implemented - The channel method is not recognized.
    MethodNotImplemented {
        /// The method name the caller sent.
        method: String,
    },

    /// 503 Service Unavailable - The bridge or its backend cannot serve requests.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "method_not_implemented",
    "message": "Method 'pairDevice' is not implemented on channel 'bluetooth_manager'",
    "details": {"method": "pairDevice"}
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "method_not_implemented").
    #[schema(example = "method_not_implemented")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Method 'pairDevice' is not implemented on channel 'bluetooth_manager'")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest { error_code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::NotFound { error_code, message } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::MethodNotImplemented { method } => (
                StatusCode::NOT_IMPLEMENTED,
                ErrorResponse {
                    error: "method_not_implemented".to_string(),
                    message: format!(
                        "Method '{method}' is not implemented on channel '{}'",
                        evolv_bridge_core::CHANNEL_NAME
                    ),
                    details: Some(serde_json::json!({ "method": method })),
                },
            ),

            Self::ServiceUnavailable { error_code, message } => {
                tracing::warn!(error_code = %error_code, message = %message, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: None,
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::MethodNotImplemented { method } => {
                write!(f, "Not Implemented: {method}")
            }
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from bridge errors.
///
/// Every bridge error means the bridge cannot serve the call right now.
impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self::ServiceUnavailable {
            error_code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_error() {
        let err = ApiError::BadRequest {
            error_code: "test_error".to_string(),
            message: "Test message".to_string(),
        };
        assert!(err.to_string().contains("Bad Request"));
    }

    #[test]
    fn test_method_not_implemented_status() {
        let response = ApiError::MethodNotImplemented {
            method: "pairDevice".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_bridge_stopped_is_service_unavailable() {
        let err = ApiError::from(BridgeError::BridgeStopped);
        assert!(matches!(
            err,
            ApiError::ServiceUnavailable { ref error_code, .. } if error_code == "bridge_stopped"
        ));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_unavailable_backend_is_service_unavailable() {
        let err = ApiError::from(BridgeError::BackendUnavailable {
            backend: "bluez".to_string(),
            reason: "no adapter".to_string(),
        });
        assert!(matches!(
            err,
            ApiError::ServiceUnavailable { ref error_code, .. } if error_code == "backend_unavailable"
        ));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "test_error".to_string(),
            message: "Test message".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test_error"));
    }
}
