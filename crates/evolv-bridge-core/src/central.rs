//! Seam between the bridge and a platform Bluetooth central manager.
//!
//! A backend implements [`CentralFactory`] and [`CentralManager`]. The bridge
//! asks the factory for a handle lazily, hands it a [`CentralEventSink`], and
//! from then on the backend reports adapter state and advertisements through
//! that sink. Every event lands on the same queue as caller commands.

use std::fmt;

use tokio::sync::mpsc::WeakUnboundedSender;

use crate::device::Advertisement;
use crate::service::Inbound;
use crate::state::AdapterState;

/// A platform callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CentralEvent {
    /// The adapter reported its state.
    StateUpdated(AdapterState),
    /// An advertisement was received while scanning.
    Discovered(Advertisement),
}

/// Handle to a platform central manager.
///
/// Both operations are fire-and-forget: they issue a request to the platform
/// and return without waiting for it to take effect.
pub trait CentralManager: Send {
    /// Begin an unfiltered advertisement scan.
    fn scan_for_peripherals(&mut self);

    /// Stop scanning. Must be harmless when no scan is active.
    fn stop_scan(&mut self);
}

/// Creates the platform handle on first use.
pub trait CentralFactory: Send {
    /// The handle type this factory produces.
    type Central: CentralManager;

    /// Create the handle. Called at most once per bridge.
    ///
    /// The platform is expected to report the adapter state through `events`
    /// shortly after creation.
    fn create(&mut self, events: CentralEventSink) -> Self::Central;
}

/// Where a backend posts its callbacks.
///
/// Holds only a weak reference to the bridge queue, so late callbacks from a
/// backend that outlives its bridge are dropped.
#[derive(Clone)]
pub struct CentralEventSink {
    inbox: WeakUnboundedSender<Inbound>,
}

impl CentralEventSink {
    pub(crate) const fn new(inbox: WeakUnboundedSender<Inbound>) -> Self {
        Self { inbox }
    }

    /// Post an event. Returns `false` if the bridge is gone.
    pub fn deliver(&self, event: CentralEvent) -> bool {
        self.inbox
            .upgrade()
            .is_some_and(|inbox| inbox.send(Inbound::Central(event)).is_ok())
    }

    /// Report an adapter state.
    pub fn state_updated(&self, state: AdapterState) -> bool {
        self.deliver(CentralEvent::StateUpdated(state))
    }

    /// Report an advertisement.
    pub fn discovered(&self, advertisement: Advertisement) -> bool {
        self.deliver(CentralEvent::Discovered(advertisement))
    }
}

impl fmt::Debug for CentralEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentralEventSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_sink_posts_onto_the_bridge_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = CentralEventSink::new(tx.downgrade());

        assert!(sink.state_updated(AdapterState::PoweredOn));
        match rx.try_recv().unwrap() {
            Inbound::Central(CentralEvent::StateUpdated(state)) => {
                assert_eq!(state, AdapterState::PoweredOn);
            }
            other => panic!("expected a state update, got {other:?}"),
        }
    }

    #[test]
    fn test_sink_drops_events_once_the_bridge_is_gone() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sink = CentralEventSink::new(tx.downgrade());
        drop(tx);

        assert!(!sink.state_updated(AdapterState::PoweredOff));
        assert!(!sink.discovered(Advertisement {
            id: "a".to_string(),
            name: Some("Evolv28".to_string()),
            rssi: -40,
        }));
    }
}
