use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

/// Zigbee network role reported by the bridge in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
pub enum DeviceCategory {
    Coordinator,
    Router,
    EndDevice,
    Unknown,
}

impl DeviceCategory {
    /// Classify a raw `type` value. Types this crate does not know (such as
    /// `GreenPower`) are `Unknown`.
    pub fn from_type(raw: &str) -> Self {
        raw.parse().unwrap_or(DeviceCategory::Unknown)
    }

    /// Coordinators are the bridge itself and never become managed devices.
    pub fn is_managed(self) -> bool {
        self != DeviceCategory::Coordinator
    }
}

/// A Zigbee device as persisted.
///
/// Identity is the IEEE hardware address. Rows are never deleted, only
/// flagged inactive when the bridge stops reporting them.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "ieeeAddr")]
    pub ieee_address: String,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub date_code: Option<String>,
    pub friendly_name: String,
    pub area_id: Option<i64>,
    #[serde(rename = "manufacturerName")]
    pub manufacturer: Option<String>,
    #[serde(rename = "modelID")]
    pub model_id: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub battery: Option<f64>,
    pub active: bool,
}

/// Fields needed to insert a device seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    pub ieee_address: String,
    pub date_code: Option<String>,
    pub friendly_name: String,
    pub manufacturer: Option<String>,
    pub model_id: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub device_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!(DeviceCategory::from_type("Coordinator"), DeviceCategory::Coordinator);
        assert_eq!(DeviceCategory::from_type("EndDevice"), DeviceCategory::EndDevice);
        assert_eq!(DeviceCategory::from_type("GreenPower"), DeviceCategory::Unknown);
        assert_eq!(DeviceCategory::from_type(""), DeviceCategory::Unknown);
    }

    #[test]
    fn test_only_coordinator_is_unmanaged() {
        assert!(!DeviceCategory::Coordinator.is_managed());
        assert!(DeviceCategory::Router.is_managed());
        assert!(DeviceCategory::Unknown.is_managed());
        assert_eq!(DeviceCategory::EndDevice.as_ref(), "EndDevice");
    }
}
