//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use evolv_bridge_core::{Backend, BridgeHandle};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    bridge: BridgeHandle,
    backend: Backend,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl AppState {
    /// Create application state around a running bridge.
    #[must_use]
    pub fn new(bridge: BridgeHandle, backend: Backend) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                bridge,
                backend,
                started_at: Utc::now(),
                started: Instant::now(),
            }),
        }
    }

    /// The bridge this server hosts.
    #[must_use]
    pub fn bridge(&self) -> &BridgeHandle {
        &self.inner.bridge
    }

    /// The Bluetooth backend the bridge drives.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.inner.backend
    }

    /// When the server started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Seconds since the server started.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started.elapsed().as_secs()
    }
}
