//! # evolv-bridge-server
//!
//! HTTP host for the Evolv28 Bluetooth bridge.
//!
//! This library provides the API handlers, backend startup, and state
//! management used by the `evolv-bridge-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod backend;
pub mod logging;
pub mod state;
