//! # evolv-bridge-core
//!
//! Bluetooth adapter bridge for the Evolv28 application shell.
//!
//! This crate provides:
//! - Adapter power/authorization state tracking, with permission derived from it
//! - Advertisement-based discovery of devices whose name contains `evolv28`
//! - The string-keyed message-channel protocol spoken with the shell
//! - A single-queue service that serializes commands and platform callbacks
//!
//! ## Architecture
//!
//! - [`state`] - Adapter and permission state, and the mapping between them
//! - [`device`] - Discovered devices and the name filter
//! - [`protocol`] - Commands, replies, notifications and channel dialects
//! - [`central`] - The platform central-manager seam
//! - [`bridge`] - [`AdapterBridge`], the translator between the two sides
//! - [`service`] - Runs a bridge on one task and hands out [`BridgeHandle`]s
//! - [`simulated`] - An in-process radio for tests and demos
//! - `bluez` - BlueZ backend (feature `bluetooth`)
//! - [`config`] - Layered configuration
//! - [`error`] - Unified error type

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

#[cfg(feature = "bluetooth")]
pub mod bluez;
pub mod bridge;
pub mod central;
pub mod config;
pub mod device;
pub mod error;
pub mod protocol;
pub mod service;
pub mod simulated;
pub mod state;

// Re-export primary types for convenience
#[cfg(feature = "bluetooth")]
pub use bluez::{BluezCentral, BluezRadio};
pub use bridge::{AdapterBridge, ScanOutcome};
pub use central::{CentralEvent, CentralEventSink, CentralFactory, CentralManager};
pub use config::{
    default_config_path, Backend, BluetoothConfig, Config, ConfigError, ConfigResult,
    LoggingConfig, ServerConfig, SimulatedConfig, SimulatedPeripheral,
};
pub use device::{matches_name_filter, Advertisement, DiscoveredDevice, DEVICE_NAME_FILTER};
pub use error::{BridgeError, Result};
pub use protocol::{
    ChannelDialect, Command, MethodCall, MethodResponse, Notification, Reply, StateChange,
    UnknownMethod, CHANNEL_NAME,
};
pub use service::{BridgeHandle, BridgeService};
pub use simulated::{SimulatedCentral, SimulatedRadio};
pub use state::{AdapterState, PermissionState};
