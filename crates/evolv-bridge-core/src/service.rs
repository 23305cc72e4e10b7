//! Runs an [`AdapterBridge`] on a single task.
//!
//! Caller commands and platform callbacks are posted onto one unbounded queue
//! and applied in arrival order by the task that owns the bridge, so the
//! adapter state is never touched from two places at once and the last
//! callback always wins. Notifications fan out to every subscriber over a
//! broadcast channel.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace};

use crate::bridge::AdapterBridge;
use crate::central::{CentralEvent, CentralEventSink, CentralFactory};
use crate::error::{BridgeError, Result};
use crate::protocol::{ChannelDialect, MethodCall, MethodResponse, Notification};

/// Notifications buffered per subscriber before the slowest one starts lagging.
pub const NOTIFICATION_CAPACITY: usize = 256;

/// A message on the bridge queue.
pub(crate) enum Inbound {
    /// A caller command awaiting its response.
    Call {
        call: MethodCall,
        reply: oneshot::Sender<MethodResponse>,
    },
    /// A platform callback.
    Central(CentralEvent),
}

/// Spawns bridge tasks.
pub struct BridgeService;

impl BridgeService {
    /// Start a bridge over `factory` on the current tokio runtime.
    ///
    /// The task stops once every [`BridgeHandle`] has been dropped.
    pub fn spawn<F>(factory: F, dialect: ChannelDialect) -> BridgeHandle
    where
        F: CentralFactory + 'static,
        F::Central: 'static,
    {
        let (inbox, queue) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let bridge = AdapterBridge::new(factory, CentralEventSink::new(inbox.downgrade()), dialect);
        tokio::spawn(run(bridge, queue, notifications.clone()));

        info!(%dialect, "Bridge service started");
        BridgeHandle {
            inbox,
            notifications,
            dialect,
        }
    }
}

async fn run<F: CentralFactory>(
    mut bridge: AdapterBridge<F>,
    mut queue: mpsc::UnboundedReceiver<Inbound>,
    notifications: broadcast::Sender<Notification>,
) {
    while let Some(message) = queue.recv().await {
        match message {
            Inbound::Call { call, reply } => {
                let response = bridge.handle_call(&call);
                if reply.send(response).is_err() {
                    debug!(method = %call.method, "Caller went away before the reply");
                }
            }
            Inbound::Central(event) => {
                if let Some(notification) = bridge.handle_event(event) {
                    let method = notification.method_name();
                    match notifications.send(notification) {
                        Ok(receivers) => trace!(method, receivers, "Notification published"),
                        Err(_) => trace!(method, "Notification dropped, no subscribers"),
                    }
                }
            }
        }
    }
    info!("Bridge service stopped");
}

/// Cheap, cloneable handle to a running bridge.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    inbox: mpsc::UnboundedSender<Inbound>,
    notifications: broadcast::Sender<Notification>,
    dialect: ChannelDialect,
}

impl BridgeHandle {
    /// Send a method call and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::BridgeStopped`] if the bridge task has exited.
    pub async fn invoke(&self, call: MethodCall) -> Result<MethodResponse> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(Inbound::Call { call, reply })
            .map_err(|_| BridgeError::BridgeStopped)?;
        response.await.map_err(|_| BridgeError::BridgeStopped)
    }

    /// Invoke `method` with no arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::BridgeStopped`] if the bridge task has exited.
    pub async fn invoke_method(&self, method: &str) -> Result<MethodResponse> {
        self.invoke(MethodCall::new(method)).await
    }

    /// Receive every notification published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Number of live notification subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.notifications.receiver_count()
    }

    /// The reply encoding the bridge uses.
    #[must_use]
    pub const fn dialect(&self) -> ChannelDialect {
        self.dialect
    }
}

impl std::fmt::Debug for Inbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call { call, .. } => f.debug_struct("Call").field("call", call).finish_non_exhaustive(),
            Self::Central(event) => f.debug_tuple("Central").field(event).finish(),
        }
    }
}
