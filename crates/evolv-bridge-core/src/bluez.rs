//! BlueZ central manager (Linux, via `bluer`).
//!
//! Adapter state mapping:
//!
//! - no daemon / no adapter → `unsupported`
//! - D-Bus authorization failure → `unauthorized`
//! - `Powered` property → `powered_on` / `powered_off`
//!
//! BlueZ only announces a device once per discovery session, so repeated
//! advertisements are observed as RSSI property updates. Each addition and each
//! RSSI update is reported as one advertisement.

use std::pin::Pin;

use bluer::{
    Adapter, AdapterEvent, AdapterProperty, Address, Device, DeviceEvent, DeviceProperty, Session,
};
use futures::stream::{SelectAll, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::central::{CentralEventSink, CentralFactory, CentralManager};
use crate::device::Advertisement;
use crate::state::AdapterState;

type AdapterEvents = Pin<Box<dyn Stream<Item = AdapterEvent> + Send>>;
type DeviceEvents = Pin<Box<dyn Stream<Item = (Address, DeviceEvent)> + Send>>;

#[derive(Debug, Clone, Copy)]
enum ScanRequest {
    Start,
    Stop,
}

/// Creates [`BluezCentral`] handles on the default BlueZ adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct BluezRadio;

impl CentralFactory for BluezRadio {
    type Central = BluezCentral;

    fn create(&mut self, events: CentralEventSink) -> Self::Central {
        let (requests, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(events, rx));
        BluezCentral { requests, task }
    }
}

/// Handle to the BlueZ driver task. Dropping it stops the task.
#[derive(Debug)]
pub struct BluezCentral {
    requests: mpsc::UnboundedSender<ScanRequest>,
    task: JoinHandle<()>,
}

impl BluezCentral {
    fn request(&self, request: ScanRequest) {
        if self.requests.send(request).is_err() {
            debug!(?request, "BlueZ driver has exited, request ignored");
        }
    }
}

impl CentralManager for BluezCentral {
    fn scan_for_peripherals(&mut self) {
        self.request(ScanRequest::Start);
    }

    fn stop_scan(&mut self) {
        self.request(ScanRequest::Stop);
    }
}

impl Drop for BluezCentral {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn open_default_adapter() -> bluer::Result<(Session, Adapter)> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    info!(adapter = adapter.name(), "Using BlueZ adapter");
    Ok((session, adapter))
}

fn state_for_error(err: &bluer::Error) -> AdapterState {
    match err.kind {
        bluer::ErrorKind::NotAuthorized | bluer::ErrorKind::NotPermitted => {
            AdapterState::Unauthorized
        }
        _ => AdapterState::Unsupported,
    }
}

const fn powered_state(powered: bool) -> AdapterState {
    if powered {
        AdapterState::PoweredOn
    } else {
        AdapterState::PoweredOff
    }
}

async fn next_discovery_event(discovery: &mut Option<AdapterEvents>) -> Option<AdapterEvent> {
    match discovery {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn report(events: &CentralEventSink, device: &Device, rssi: Option<i16>) {
    let rssi = match rssi {
        Some(rssi) => Some(rssi),
        None => device.rssi().await.ok().flatten(),
    };
    // Cached devices without a fresh RSSI were not actually heard.
    let Some(rssi) = rssi else {
        return;
    };

    events.discovered(Advertisement {
        id: device.address().to_string(),
        name: device.name().await.ok().flatten(),
        rssi: i32::from(rssi),
    });
}

async fn drive(events: CentralEventSink, mut requests: mpsc::UnboundedReceiver<ScanRequest>) {
    let (_session, adapter) = match open_default_adapter().await {
        Ok(opened) => opened,
        Err(err) => {
            warn!(error = %err, "BlueZ adapter unavailable");
            events.state_updated(state_for_error(&err));
            return;
        }
    };

    let initial = match adapter.is_powered().await {
        Ok(powered) => powered_state(powered),
        Err(err) => state_for_error(&err),
    };
    events.state_updated(initial);

    let mut adapter_events: AdapterEvents = match adapter.events().await {
        Ok(stream) => Box::pin(stream),
        Err(err) => {
            warn!(error = %err, "Cannot watch BlueZ adapter properties");
            return;
        }
    };

    let mut discovery: Option<AdapterEvents> = None;
    let mut device_events: SelectAll<DeviceEvents> = SelectAll::new();

    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(ScanRequest::Start) if discovery.is_none() => {
                    match adapter.discover_devices().await {
                        Ok(stream) => {
                            info!("BlueZ discovery started");
                            discovery = Some(Box::pin(stream));
                        }
                        Err(err) => warn!(error = %err, "BlueZ discovery failed to start"),
                    }
                }
                Some(ScanRequest::Start) => debug!("BlueZ discovery already running"),
                Some(ScanRequest::Stop) => {
                    if discovery.take().is_some() {
                        info!("BlueZ discovery stopped");
                    }
                    device_events = SelectAll::new();
                }
                None => break,
            },
            Some(event) = adapter_events.next() => {
                if let AdapterEvent::PropertyChanged(AdapterProperty::Powered(powered)) = event {
                    if !powered {
                        discovery = None;
                        device_events = SelectAll::new();
                    }
                    events.state_updated(powered_state(powered));
                }
            }
            event = next_discovery_event(&mut discovery) => match event {
                Some(AdapterEvent::DeviceAdded(address)) => {
                    let Ok(device) = adapter.device(address) else {
                        continue;
                    };
                    report(&events, &device, None).await;
                    match device.events().await {
                        Ok(stream) => device_events.push(Box::pin(stream.map(move |e| (address, e)))),
                        Err(err) => debug!(%address, error = %err, "Cannot watch device"),
                    }
                }
                Some(_) => {}
                None => {
                    debug!("BlueZ discovery stream ended");
                    discovery = None;
                }
            },
            Some((address, event)) = device_events.next(), if !device_events.is_empty() => {
                if let DeviceEvent::PropertyChanged(DeviceProperty::Rssi(rssi)) = event {
                    if let Ok(device) = adapter.device(address) {
                        report(&events, &device, Some(rssi)).await;
                    }
                }
            }
        }
    }

    debug!("BlueZ driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powered_state_mapping() {
        assert_eq!(powered_state(true), AdapterState::PoweredOn);
        assert_eq!(powered_state(false), AdapterState::PoweredOff);
    }

    fn error(kind: bluer::ErrorKind) -> bluer::Error {
        bluer::Error {
            kind,
            message: String::new(),
        }
    }

    #[test]
    fn test_access_errors_map_to_unauthorized() {
        for kind in [bluer::ErrorKind::NotAuthorized, bluer::ErrorKind::NotPermitted] {
            assert_eq!(state_for_error(&error(kind)), AdapterState::Unauthorized);
        }
    }

    #[test]
    fn test_other_errors_map_to_unsupported() {
        for kind in [
            bluer::ErrorKind::NotReady,
            bluer::ErrorKind::NotSupported,
            bluer::ErrorKind::Failed,
        ] {
            assert_eq!(state_for_error(&error(kind)), AdapterState::Unsupported);
        }
    }
}
