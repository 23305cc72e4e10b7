//! Adapter and permission state.
//!
//! [`AdapterState`] is the single source of truth for everything the bridge
//! reports about the local radio. [`PermissionState`] is never stored: it is
//! derived from the adapter state on demand through
//! [`AdapterState::permission`], so the two can never disagree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Power/support/authorization condition of the local Bluetooth radio.
///
/// Set exclusively by platform callbacks; the last callback wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// No callback has been delivered yet, or the platform handle does not exist.
    #[default]
    Unknown,
    /// The platform stack is restarting.
    Resetting,
    /// This host has no usable Bluetooth LE radio.
    Unsupported,
    /// The application is not allowed to use Bluetooth.
    Unauthorized,
    /// The radio is authorized but switched off.
    PoweredOff,
    /// The radio is authorized and on.
    PoweredOn,
}

/// Application-facing view of whether Bluetooth use is authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Authorization has not been determined yet.
    Unknown,
    /// The platform stack is restarting.
    Resetting,
    /// Bluetooth is not supported, so permission is meaningless.
    Unsupported,
    /// The user or system refused Bluetooth access.
    Denied,
    /// Access is granted but the radio is off.
    GrantedButOff,
    /// Access is granted and the radio is on.
    Granted,
}

/// A string token that does not name any [`AdapterState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized adapter state '{0}'")]
pub struct UnknownAdapterState(pub String);

impl AdapterState {
    /// All variants, in platform enum order.
    pub const ALL: [Self; 6] = [
        Self::Unknown,
        Self::Resetting,
        Self::Unsupported,
        Self::Unauthorized,
        Self::PoweredOff,
        Self::PoweredOn,
    ];

    /// The wire token for this state.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Resetting => "resetting",
            Self::Unsupported => "unsupported",
            Self::Unauthorized => "unauthorized",
            Self::PoweredOff => "powered_off",
            Self::PoweredOn => "powered_on",
        }
    }

    /// Derive the permission state.
    ///
    /// This is the only legal derivation path for [`PermissionState`].
    #[must_use]
    pub const fn permission(self) -> PermissionState {
        match self {
            Self::Unknown => PermissionState::Unknown,
            Self::Resetting => PermissionState::Resetting,
            Self::Unsupported => PermissionState::Unsupported,
            Self::Unauthorized => PermissionState::Denied,
            Self::PoweredOff => PermissionState::GrantedButOff,
            Self::PoweredOn => PermissionState::Granted,
        }
    }

    /// Whether the radio can be used right now.
    #[inline]
    #[must_use]
    pub const fn is_powered_on(self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

impl PermissionState {
    /// The wire token for this permission state.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Resetting => "resetting",
            Self::Unsupported => "unsupported",
            Self::Denied => "denied",
            Self::GrantedButOff => "granted_but_off",
            Self::Granted => "granted",
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for AdapterState {
    type Err = UnknownAdapterState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.token() == s)
            .ok_or_else(|| UnknownAdapterState(s.to_string()))
    }
}
