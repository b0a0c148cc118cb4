//! Group on/off commands.

use log::info;
use serde::Serialize;
use std::sync::Arc;

use crate::bus::{Bus, Topics};
use crate::error::Result;
use crate::model::Group;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    On,
    Off,
}

/// The `{"state": ...}` body zigbee2mqtt expects on a `/set` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupCommand {
    pub state: GroupState,
}

impl GroupCommand {
    pub const ON: GroupCommand = GroupCommand {
        state: GroupState::On,
    };
    pub const OFF: GroupCommand = GroupCommand {
        state: GroupState::Off,
    };
}

/// Publishes group commands. Fire and forget: returns once the bus client
/// accepted the publish, without waiting for the devices to act.
#[derive(Clone)]
pub struct CommandDispatcher {
    bus: Arc<dyn Bus>,
    topics: Topics,
}

impl CommandDispatcher {
    pub fn new(bus: Arc<dyn Bus>, topics: Topics) -> Self {
        Self { bus, topics }
    }

    pub async fn send(&self, group: &Group, command: GroupCommand) -> Result<()> {
        let topic = self.topics.group_set(&group.friendly_name);
        let payload = serde_json::to_vec(&command)?;

        self.bus.publish(&topic, &payload).await?;
        info!(
            "[Groups] Sent {:?} to {} ({})",
            command.state, group.friendly_name, group.id
        );
        Ok(())
    }
}
