//! Unified error type for the bridge.
//!
//! Only infrastructure failures are errors. Expected negative outcomes, such
//! as starting a scan while the adapter is off, are ordinary replies, and an
//! unrecognized method is a [`crate::protocol::MethodResponse::NotImplemented`]
//! response rather than an error.

use thiserror::Error;

/// Errors raised by the bridge service and its hosts.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bridge task has exited and can no longer answer calls.
    #[error("Bridge service has stopped; restart the host to resume Bluetooth operations.")]
    BridgeStopped,

    /// The configured Bluetooth backend cannot be used on this host.
    #[error("Bluetooth backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable {
        /// Backend name.
        backend: String,
        /// Why it cannot be used.
        reason: String,
    },
}

/// A specialized [`Result`] type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BridgeStopped => "bridge_stopped",
            Self::BackendUnavailable { .. } => "backend_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(BridgeError::BridgeStopped.error_code(), "bridge_stopped");
        assert_eq!(
            BridgeError::BackendUnavailable {
                backend: "bluez".into(),
                reason: "feature disabled".into(),
            }
            .error_code(),
            "backend_unavailable"
        );
    }

    #[test]
    fn test_display_messages() {
        let err = BridgeError::BackendUnavailable {
            backend: "bluez".into(),
            reason: "no adapter".into(),
        };
        assert!(err.to_string().contains("bluez"));
        assert!(err.to_string().contains("no adapter"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<BridgeError>();
        assert_sync::<BridgeError>();
    }
}
