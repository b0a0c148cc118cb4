//! Message bus plumbing for zigbee2mqtt.
//!
//! The reconcilers, the subscription registry and the command dispatcher
//! depend on the [`Bus`] trait only; [`MqttClient`] provides the rumqttc
//! implementation.

mod client;
#[cfg(test)]
pub mod recording;
mod topics;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{MqttBus, MqttClient};
pub use topics::Topics;

/// A publish received from the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish a non-retained message. Returns once the client accepted it.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;

    async fn subscribe(&self, topic: &str) -> Result<()>;
}
