//! Message-channel protocol between the bridge and the application shell.
//!
//! Both directions share one channel, named [`CHANNEL_NAME`]:
//!
//! - caller → bridge: a [`MethodCall`] naming a [`Command`], answered with a
//!   [`MethodResponse`]
//! - bridge → caller: unsolicited [`Notification`]s
//!
//! Reply and payload encodings differ between the two shells the bridge has
//! served; [`ChannelDialect`] selects one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::device::DiscoveredDevice;
use crate::state::{AdapterState, PermissionState};

/// Name of the message channel shared by commands and notifications.
pub const CHANNEL_NAME: &str = "bluetooth_manager";

/// Reply token for `requestBluetoothPermission`.
pub const PERMISSION_REQUESTED: &str = "permission_requested";
/// Reply token for a `startScanning` that issued a scan.
pub const SCANNING_STARTED: &str = "scanning_started";
/// Reply token for a `startScanning` refused because the radio is not on.
pub const BLUETOOTH_NOT_AVAILABLE: &str = "bluetooth_not_available";
/// Reply token for `stopScanning`.
pub const SCANNING_STOPPED: &str = "scanning_stopped";

/// An inbound method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Command name, e.g. `startScanning`.
    pub method: String,
    /// Call arguments. No current command takes any.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl MethodCall {
    /// A call with no arguments.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: serde_json::Value::Null,
        }
    }
}

/// Every command the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `getBluetoothStatus`: current adapter state token.
    GetBluetoothStatus,
    /// `getBluetoothState`: alias of `getBluetoothStatus`.
    GetBluetoothState,
    /// `getBluetoothPermissionStatus`: derived permission token.
    GetBluetoothPermissionStatus,
    /// `requestBluetoothPermission`: provoke the platform permission prompt.
    RequestBluetoothPermission,
    /// `isBluetoothEnabled`: whether the adapter is powered on.
    IsBluetoothEnabled,
    /// `startScanning`: begin an unfiltered advertisement scan.
    StartScanning,
    /// `stopScanning`: stop scanning, unconditionally.
    StopScanning,
}

/// A method name that maps to no [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("method '{0}' is not implemented")]
pub struct UnknownMethod(pub String);

impl Command {
    /// All commands.
    pub const ALL: [Self; 7] = [
        Self::GetBluetoothStatus,
        Self::GetBluetoothState,
        Self::GetBluetoothPermissionStatus,
        Self::RequestBluetoothPermission,
        Self::IsBluetoothEnabled,
        Self::StartScanning,
        Self::StopScanning,
    ];

    /// The method name used on the channel.
    #[must_use]
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::GetBluetoothStatus => "getBluetoothStatus",
            Self::GetBluetoothState => "getBluetoothState",
            Self::GetBluetoothPermissionStatus => "getBluetoothPermissionStatus",
            Self::RequestBluetoothPermission => "requestBluetoothPermission",
            Self::IsBluetoothEnabled => "isBluetoothEnabled",
            Self::StartScanning => "startScanning",
            Self::StopScanning => "stopScanning",
        }
    }
}

impl FromStr for Command {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.method_name() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Reply value of a successful command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// A descriptive string token.
    Token(&'static str),
    /// A boolean outcome.
    Flag(bool),
}

impl Reply {
    /// The reply as a JSON value.
    #[must_use]
    pub fn to_value(self) -> serde_json::Value {
        match self {
            Self::Token(token) => serde_json::Value::from(token),
            Self::Flag(flag) => serde_json::Value::from(flag),
        }
    }
}

/// Response to a [`MethodCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodResponse {
    /// The command ran; this is its reply.
    Success(Reply),
    /// The method name was not recognized. Nothing else happened.
    NotImplemented,
}

impl MethodResponse {
    /// The reply, if the method was recognized.
    #[must_use]
    pub const fn reply(self) -> Option<Reply> {
        match self {
            Self::Success(reply) => Some(reply),
            Self::NotImplemented => None,
        }
    }
}

/// Reply/payload encoding expected by the application shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDialect {
    /// String reply tokens; state notifications carry the permission token.
    #[default]
    Ios,
    /// Boolean replies; state notifications carry an `isEnabled` flag.
    Macos,
}

impl ChannelDialect {
    /// Build the state-change payload for `state`.
    #[must_use]
    pub const fn state_change(self, state: AdapterState) -> StateChange {
        match self {
            Self::Ios => StateChange::WithPermission {
                state,
                permission: state.permission(),
            },
            Self::Macos => StateChange::WithEnabledFlag {
                is_enabled: state.is_powered_on(),
                state,
            },
        }
    }
}

impl fmt::Display for ChannelDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ios => f.write_str("ios"),
            Self::Macos => f.write_str("macos"),
        }
    }
}

/// Payload of `onBluetoothStateChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateChange {
    /// `{ state, permission }`
    WithPermission {
        /// New adapter state.
        state: AdapterState,
        /// Permission derived from `state`.
        permission: PermissionState,
    },
    /// `{ isEnabled, state }`
    WithEnabledFlag {
        /// Derived from `state`; never tracked separately.
        #[serde(rename = "isEnabled")]
        is_enabled: bool,
        /// New adapter state.
        state: AdapterState,
    },
}

impl StateChange {
    /// The adapter state carried by this payload.
    #[must_use]
    pub const fn state(&self) -> AdapterState {
        match self {
            Self::WithPermission { state, .. } | Self::WithEnabledFlag { state, .. } => *state,
        }
    }
}

/// Unsolicited bridge → caller message.
///
/// Serialized as `{ "method": ..., "arguments": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "arguments")]
pub enum Notification {
    /// The adapter reported a state (possibly the same one again).
    #[serde(rename = "onBluetoothStateChanged")]
    BluetoothStateChanged(StateChange),
    /// A device whose name passes the filter advertised.
    #[serde(rename = "onDeviceDiscovered")]
    DeviceDiscovered(DiscoveredDevice),
}

impl Notification {
    /// The notification's method name on the channel.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::BluetoothStateChanged(_) => "onBluetoothStateChanged",
            Self::DeviceDiscovered(_) => "onDeviceDiscovered",
        }
    }
}
