//! Discovered devices and the advertised-name filter.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Substring an advertised name must contain (case-insensitively) to be reported.
pub const DEVICE_NAME_FILTER: &str = "evolv28";

/// A single advertisement frame as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Opaque platform-assigned peripheral identifier.
    pub id: String,
    /// Advertised display name, if any.
    pub name: Option<String>,
    /// Received signal strength in dBm.
    pub rssi: i32,
}

/// A matching device, as reported in an `onDeviceDiscovered` notification.
///
/// Transient: one is built per qualifying advertisement and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "5B1C9E7A-2F44-4C1D-9B0E-1A2B3C4D5E6F",
    "name": "Evolv28-A1",
    "rssi": -58
}))]
pub struct DiscoveredDevice {
    /// Opaque platform-assigned identifier. Never parsed.
    #[schema(example = "5B1C9E7A-2F44-4C1D-9B0E-1A2B3C4D5E6F")]
    pub id: String,

    /// Advertised display name.
    #[schema(example = "Evolv28-A1")]
    pub name: String,

    /// Signal strength in dBm.
    #[schema(example = -58)]
    pub rssi: i32,
}

impl DiscoveredDevice {
    /// Build a device from an advertisement, or `None` if its name does not
    /// pass [`matches_name_filter`].
    #[must_use]
    pub fn from_advertisement(advertisement: Advertisement) -> Option<Self> {
        let Advertisement { id, name, rssi } = advertisement;
        let name = name.filter(|name| matches_name_filter(name))?;
        Some(Self { id, name, rssi })
    }
}

/// Returns `true` if `name`, lowercased, contains [`DEVICE_NAME_FILTER`].
///
/// An empty name never matches.
#[must_use]
pub fn matches_name_filter(name: &str) -> bool {
    name.to_lowercase().contains(DEVICE_NAME_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advertisement(name: Option<&str>) -> Advertisement {
        Advertisement {
            id: "peripheral-1".to_string(),
            name: name.map(str::to_string),
            rssi: -60,
        }
    }

    #[test]
    fn test_name_filter_is_case_insensitive() {
        assert!(matches_name_filter("Evolv28-A1"));
        assert!(matches_name_filter("EVOLV28"));
        assert!(matches_name_filter("my evolv28 band"));
        assert!(!matches_name_filter("MyHeadphones"));
        assert!(!matches_name_filter("evolv 28"));
        assert!(!matches_name_filter(""));
    }

    #[test]
    fn test_matching_advertisement_keeps_fields() {
        let device = DiscoveredDevice::from_advertisement(advertisement(Some("Evolv28-A1")))
            .expect("name should match");
        assert_eq!(device.id, "peripheral-1");
        assert_eq!(device.name, "Evolv28-A1");
        assert_eq!(device.rssi, -60);
    }

    #[test]
    fn test_non_matching_names_are_dropped() {
        assert!(DiscoveredDevice::from_advertisement(advertisement(Some("MyHeadphones"))).is_none());
        assert!(DiscoveredDevice::from_advertisement(advertisement(Some(""))).is_none());
        assert!(DiscoveredDevice::from_advertisement(advertisement(None)).is_none());
    }

    #[test]
    fn test_device_serialization() {
        let device = DiscoveredDevice {
            id: "abc".to_string(),
            name: "Evolv28".to_string(),
            rssi: -42,
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json, serde_json::json!({"id": "abc", "name": "Evolv28", "rssi": -42}));
    }
}
