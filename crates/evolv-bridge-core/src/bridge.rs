//! The adapter bridge.
//!
//! [`AdapterBridge`] owns the platform central-manager handle and translates
//! between caller commands, platform callbacks and outbound notifications.
//! It is deliberately synchronous and lock-free: [`crate::service`] runs it on
//! a single task so commands and callbacks never interleave.

use tracing::{debug, info, trace};

use crate::central::{CentralEvent, CentralEventSink, CentralFactory, CentralManager};
use crate::device::{Advertisement, DiscoveredDevice};
use crate::protocol::{
    ChannelDialect, Command, MethodCall, MethodResponse, Notification, Reply,
    BLUETOOTH_NOT_AVAILABLE, PERMISSION_REQUESTED, SCANNING_STARTED, SCANNING_STOPPED,
};
use crate::state::{AdapterState, PermissionState};

/// Result of a scan command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A scan was issued.
    Started,
    /// The adapter is not powered on; nothing was issued.
    BluetoothNotAvailable,
    /// Any active scan was stopped.
    Stopped,
}

impl ScanOutcome {
    /// The wire token for this outcome.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Started => SCANNING_STARTED,
            Self::BluetoothNotAvailable => BLUETOOTH_NOT_AVAILABLE,
            Self::Stopped => SCANNING_STOPPED,
        }
    }

    /// Encode this outcome for `dialect`.
    #[must_use]
    pub const fn reply(self, dialect: ChannelDialect) -> Reply {
        match dialect {
            ChannelDialect::Ios => Reply::Token(self.token()),
            ChannelDialect::Macos => Reply::Flag(!matches!(self, Self::BluetoothNotAvailable)),
        }
    }
}

/// Single owner of the platform central-manager handle.
pub struct AdapterBridge<F: CentralFactory> {
    factory: F,
    central: Option<F::Central>,
    events: CentralEventSink,
    state: AdapterState,
    dialect: ChannelDialect,
}

impl<F: CentralFactory> AdapterBridge<F> {
    /// Create a bridge. The platform handle is not created until the first
    /// command that needs it.
    pub const fn new(factory: F, events: CentralEventSink, dialect: ChannelDialect) -> Self {
        Self {
            factory,
            central: None,
            events,
            state: AdapterState::Unknown,
            dialect,
        }
    }

    /// The last reported adapter state, without creating the handle.
    #[must_use]
    pub const fn state(&self) -> AdapterState {
        self.state
    }

    /// Whether the platform handle has been created.
    #[must_use]
    pub const fn has_central(&self) -> bool {
        self.central.is_some()
    }

    /// The reply encoding in use.
    #[must_use]
    pub const fn dialect(&self) -> ChannelDialect {
        self.dialect
    }

    /// Dispatch a raw method call.
    ///
    /// An unrecognized method yields [`MethodResponse::NotImplemented`] and has
    /// no other effect.
    pub fn handle_call(&mut self, call: &MethodCall) -> MethodResponse {
        match call.method.parse::<Command>() {
            Ok(command) => MethodResponse::Success(self.handle_command(command)),
            Err(err) => {
                debug!(method = %call.method, "{err}");
                MethodResponse::NotImplemented
            }
        }
    }

    /// Run a command and encode its reply for the configured dialect.
    pub fn handle_command(&mut self, command: Command) -> Reply {
        debug!(%command, state = %self.state, "Handling command");
        match command {
            Command::GetBluetoothStatus | Command::GetBluetoothState => {
                Reply::Token(self.adapter_state().token())
            }
            Command::GetBluetoothPermissionStatus => Reply::Token(self.permission_state().token()),
            Command::IsBluetoothEnabled => Reply::Flag(self.adapter_state().is_powered_on()),
            Command::RequestBluetoothPermission => {
                self.request_permission();
                match self.dialect {
                    ChannelDialect::Ios => Reply::Token(PERMISSION_REQUESTED),
                    ChannelDialect::Macos => Reply::Flag(self.state.is_powered_on()),
                }
            }
            Command::StartScanning => self.start_scan().reply(self.dialect),
            Command::StopScanning => self.stop_scan().reply(self.dialect),
        }
    }

    /// Current adapter state. Creates the handle if absent.
    pub fn adapter_state(&mut self) -> AdapterState {
        self.central();
        self.state
    }

    /// Permission derived from the current adapter state. Creates the handle
    /// if absent.
    pub fn permission_state(&mut self) -> PermissionState {
        self.adapter_state().permission()
    }

    /// Issue a scan so the platform shows its permission prompt.
    ///
    /// Does not learn whether permission was granted; callers query the state
    /// afterwards.
    pub fn request_permission(&mut self) {
        info!("Requesting Bluetooth permission via scan");
        self.central().scan_for_peripherals();
    }

    /// Start an unfiltered scan if the adapter is powered on.
    pub fn start_scan(&mut self) -> ScanOutcome {
        self.central();
        if !self.state.is_powered_on() {
            info!(state = %self.state, "Cannot start scanning - Bluetooth not powered on");
            return ScanOutcome::BluetoothNotAvailable;
        }

        info!("Starting advertisement scan");
        self.central().scan_for_peripherals();
        ScanOutcome::Started
    }

    /// Stop any active scan. Never creates the handle.
    pub fn stop_scan(&mut self) -> ScanOutcome {
        info!("Stopping advertisement scan");
        if let Some(central) = self.central.as_mut() {
            central.stop_scan();
        }
        ScanOutcome::Stopped
    }

    /// Apply a platform callback, returning the notification it produces.
    pub fn handle_event(&mut self, event: CentralEvent) -> Option<Notification> {
        match event {
            CentralEvent::StateUpdated(state) => Some(self.on_state_update(state)),
            CentralEvent::Discovered(advertisement) => self.on_advertisement(advertisement),
        }
    }

    /// Record a new adapter state and build its notification.
    ///
    /// Fires on every delivery, including repeats of the current state.
    pub fn on_state_update(&mut self, state: AdapterState) -> Notification {
        if state != self.state {
            info!(from = %self.state, to = %state, "Bluetooth adapter state changed");
        }
        self.state = state;
        Notification::BluetoothStateChanged(self.dialect.state_change(self.state))
    }

    /// Filter an advertisement by name and build its notification.
    #[must_use]
    pub fn on_advertisement(&self, advertisement: Advertisement) -> Option<Notification> {
        trace!(id = %advertisement.id, name = ?advertisement.name, rssi = advertisement.rssi, "Advertisement");
        let device = DiscoveredDevice::from_advertisement(advertisement)?;
        debug!(id = %device.id, name = %device.name, rssi = device.rssi, "Discovered device");
        Some(Notification::DeviceDiscovered(device))
    }

    fn central(&mut self) -> &mut F::Central {
        let Self {
            factory,
            central,
            events,
            ..
        } = self;
        central.get_or_insert_with(|| {
            info!("Creating Bluetooth central manager");
            factory.create(events.clone())
        })
    }
}
