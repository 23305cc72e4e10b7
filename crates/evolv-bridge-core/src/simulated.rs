//! In-process simulated radio.
//!
//! Behaves like a platform central manager: it reports its state right after
//! the handle is created, only delivers advertisements while a scan is active,
//! and drops an active scan when the radio leaves `powered_on`. Used by the
//! `simulated` server backend and by tests.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::central::{CentralEventSink, CentralFactory, CentralManager};
use crate::device::Advertisement;
use crate::state::AdapterState;

/// Shared control handle for a simulated radio.
///
/// Clones share the same radio.
#[derive(Debug, Clone)]
pub struct SimulatedRadio {
    inner: Arc<Mutex<RadioInner>>,
}

#[derive(Debug)]
struct RadioInner {
    state: AdapterState,
    events: Option<CentralEventSink>,
    scanning: bool,
    handles_created: usize,
    scan_requests: usize,
    stop_requests: usize,
}

impl SimulatedRadio {
    /// A radio that will report `initial` once a handle is created.
    #[must_use]
    pub fn new(initial: AdapterState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RadioInner {
                state: initial,
                events: None,
                scanning: false,
                handles_created: 0,
                scan_requests: 0,
                stop_requests: 0,
            })),
        }
    }

    /// The radio's own state (not necessarily delivered yet).
    #[must_use]
    pub fn state(&self) -> AdapterState {
        self.inner.lock().state
    }

    /// Change state and deliver the callback if a handle exists.
    ///
    /// Leaving `powered_on` ends any active scan.
    pub fn set_state(&self, state: AdapterState) {
        let mut inner = self.inner.lock();
        inner.state = state;
        if !state.is_powered_on() {
            inner.scanning = false;
        }
        if let Some(events) = &inner.events {
            events.state_updated(state);
        }
    }

    /// Broadcast one advertisement frame.
    ///
    /// Returns `true` if it was delivered, which only happens while scanning.
    pub fn advertise(&self, id: impl Into<String>, name: Option<&str>, rssi: i32) -> bool {
        let inner = self.inner.lock();
        if !inner.scanning {
            return false;
        }
        inner.events.as_ref().is_some_and(|events| {
            events.discovered(Advertisement {
                id: id.into(),
                name: name.map(str::to_string),
                rssi,
            })
        })
    }

    /// Whether a scan is active.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.inner.lock().scanning
    }

    /// Number of handles created through this radio.
    #[must_use]
    pub fn handles_created(&self) -> usize {
        self.inner.lock().handles_created
    }

    /// Number of scan requests received, accepted or not.
    #[must_use]
    pub fn scan_requests(&self) -> usize {
        self.inner.lock().scan_requests
    }

    /// Number of stop requests received.
    #[must_use]
    pub fn stop_requests(&self) -> usize {
        self.inner.lock().stop_requests
    }
}

impl Default for SimulatedRadio {
    fn default() -> Self {
        Self::new(AdapterState::PoweredOn)
    }
}

/// Handle created by a [`SimulatedRadio`].
#[derive(Debug)]
pub struct SimulatedCentral {
    radio: SimulatedRadio,
}

impl CentralManager for SimulatedCentral {
    fn scan_for_peripherals(&mut self) {
        let mut inner = self.radio.inner.lock();
        inner.scan_requests += 1;
        // Like the platform, a scan issued while off is ignored.
        inner.scanning = inner.state.is_powered_on();
        debug!(scanning = inner.scanning, "Simulated scan requested");
    }

    fn stop_scan(&mut self) {
        let mut inner = self.radio.inner.lock();
        inner.stop_requests += 1;
        inner.scanning = false;
    }
}

impl CentralFactory for SimulatedRadio {
    type Central = SimulatedCentral;

    fn create(&mut self, events: CentralEventSink) -> Self::Central {
        let mut inner = self.inner.lock();
        inner.handles_created += 1;
        events.state_updated(inner.state);
        inner.events = Some(events);
        drop(inner);

        SimulatedCentral {
            radio: self.clone(),
        }
    }
}
