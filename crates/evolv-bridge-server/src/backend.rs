//! Starts the bridge over the configured Bluetooth backend.

use std::time::Duration;

use evolv_bridge_core::{
    Backend, BluetoothConfig, BridgeError, BridgeHandle, BridgeService, ChannelDialect,
    SimulatedConfig, SimulatedRadio,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;
use uuid::Uuid;

/// Spawn a bridge for `config`.
///
/// For the simulated backend this also starts the peripheral advertiser.
///
/// # Errors
///
/// Returns [`BridgeError::BackendUnavailable`] if the backend was not compiled in.
pub fn start_bridge(config: &BluetoothConfig) -> evolv_bridge_core::Result<BridgeHandle> {
    match config.backend {
        Backend::Simulated => {
            let radio = SimulatedRadio::new(config.simulated.initial_state);
            spawn_advertiser(radio.clone(), &config.simulated);
            Ok(BridgeService::spawn(radio, config.dialect))
        }
        Backend::Bluez => start_bluez(config.dialect),
    }
}

#[cfg(feature = "bluetooth")]
#[allow(clippy::unnecessary_wraps)]
fn start_bluez(dialect: ChannelDialect) -> evolv_bridge_core::Result<BridgeHandle> {
    Ok(BridgeService::spawn(evolv_bridge_core::BluezRadio, dialect))
}

#[cfg(not(feature = "bluetooth"))]
fn start_bluez(_dialect: ChannelDialect) -> evolv_bridge_core::Result<BridgeHandle> {
    Err(BridgeError::BackendUnavailable {
        backend: Backend::Bluez.to_string(),
        reason: "this build does not include the `bluetooth` feature".to_string(),
    })
}

/// Periodically advertise every configured peripheral on `radio`.
///
/// Frames are only delivered while the bridge is scanning. Each peripheral
/// gets a random identifier for the lifetime of the process.
pub fn spawn_advertiser(radio: SimulatedRadio, config: &SimulatedConfig) -> Option<JoinHandle<()>> {
    if config.peripherals.is_empty() {
        return None;
    }

    let peripherals: Vec<(String, String, i32)> = config
        .peripherals
        .iter()
        .map(|p| (Uuid::new_v4().to_string().to_uppercase(), p.name.clone(), p.rssi))
        .collect();
    let period = Duration::from_millis(config.advertise_interval_ms.max(1));

    info!(
        peripherals = peripherals.len(),
        interval_ms = config.advertise_interval_ms,
        "Simulated advertiser started"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            for (id, name, rssi) in &peripherals {
                radio.advertise(id.as_str(), Some(name.as_str()), *rssi);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use evolv_bridge_core::{AdapterState, Notification, Reply, SimulatedPeripheral};
    use tokio::time::timeout;

    use super::*;

    fn simulated(peripherals: Vec<SimulatedPeripheral>) -> SimulatedConfig {
        SimulatedConfig {
            initial_state: AdapterState::PoweredOn,
            advertise_interval_ms: 10,
            peripherals,
        }
    }

    #[tokio::test]
    async fn test_bluez_requires_feature_or_starts() {
        let config = BluetoothConfig {
            backend: Backend::Bluez,
            ..BluetoothConfig::default()
        };
        let result = start_bridge(&config);
        if cfg!(feature = "bluetooth") {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(BridgeError::BackendUnavailable { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_simulated_backend_answers_calls() {
        let handle = start_bridge(&BluetoothConfig::default()).unwrap();
        let response = handle.invoke_method("stopScanning").await.unwrap();
        assert_eq!(response.reply(), Some(Reply::Token("scanning_stopped")));
    }

    #[tokio::test]
    async fn test_advertiser_feeds_filtered_discoveries() {
        let radio = SimulatedRadio::new(AdapterState::PoweredOn);
        let handle = BridgeService::spawn(radio.clone(), ChannelDialect::Ios);
        let mut notifications = handle.subscribe();

        handle.invoke_method("getBluetoothStatus").await.unwrap();
        handle.invoke_method("startScanning").await.unwrap();

        let advertiser = spawn_advertiser(
            radio,
            &simulated(vec![
                SimulatedPeripheral {
                    name: "Headphones".to_string(),
                    rssi: -40,
                },
                SimulatedPeripheral {
                    name: "Evolv28-SIM".to_string(),
                    rssi: -55,
                },
            ]),
        )
        .expect("advertiser should start");

        let device = timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(Notification::DeviceDiscovered(device)) = notifications.recv().await {
                    return device;
                }
            }
        })
        .await
        .expect("no discovery within timeout");

        assert_eq!(device.name, "Evolv28-SIM");
        assert_eq!(device.rssi, -55);
        assert!(Uuid::parse_str(&device.id).is_ok());
        advertiser.abort();
    }

    #[test]
    fn test_no_peripherals_no_advertiser() {
        let radio = SimulatedRadio::default();
        assert!(spawn_advertiser(radio, &simulated(Vec::new())).is_none());
    }
}
