/// zigbee2mqtt topic naming, all relative to one configurable root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    root: String,
}

impl Topics {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Publishing `{}` here makes the bridge push a fresh device snapshot.
    pub fn request_devices(&self) -> String {
        format!("{}/bridge/config/devices/get", self.root)
    }

    pub fn devices(&self) -> String {
        format!("{}/bridge/devices", self.root)
    }

    pub fn groups(&self) -> String {
        format!("{}/bridge/groups", self.root)
    }

    /// State/telemetry topic of a device.
    pub fn device(&self, friendly_name: &str) -> String {
        format!("{}/{}", self.root, friendly_name)
    }

    /// Command topic of a group.
    pub fn group_set(&self, friendly_name: &str) -> String {
        format!("{}/{}/set", self.root, friendly_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_layout() {
        let topics = Topics::new("zigbee2mqtt");
        assert_eq!(topics.request_devices(), "zigbee2mqtt/bridge/config/devices/get");
        assert_eq!(topics.devices(), "zigbee2mqtt/bridge/devices");
        assert_eq!(topics.groups(), "zigbee2mqtt/bridge/groups");
        assert_eq!(topics.device("Office Sensor"), "zigbee2mqtt/Office Sensor");
        assert_eq!(
            topics.group_set("Living Room"),
            "zigbee2mqtt/Living Room/set"
        );
    }
}
