//! MQTT client wrapper for zigbee2mqtt communication.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Bus, BusMessage};
use crate::config::MqttConfig;
use crate::error::{DomicileError, Result};

/// MQTT client for zigbee2mqtt communication.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    pub fn new(config: &MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Self { client, event_loop }
    }

    /// A publish/subscribe handle that stops accepting work once `cancel` fires.
    pub fn bus(&self, cancel: CancellationToken) -> MqttBus {
        MqttBus {
            client: self.client.clone(),
            cancel,
        }
    }

    /// Run the MQTT event loop and forward received publishes to `tx`.
    ///
    /// Returns `Ok(())` when cancelled or when the receiver is gone. A broker
    /// connection error ends the loop with [`DomicileError::ConnectionLost`];
    /// callers treat that as fatal.
    pub async fn run(mut self, tx: mpsc::Sender<BusMessage>, cancel: CancellationToken) -> Result<()> {
        info!("[MQTT] Starting event loop");

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[MQTT] Event loop cancelled");
                    return Ok(());
                }
                event = self.event_loop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("[MQTT] Connection to broker successful");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    debug!(
                        "[MQTT] Received {} bytes on {}",
                        publish.payload.len(),
                        publish.topic
                    );

                    let msg = BusMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                    if tx.send(msg).await.is_err() {
                        warn!("[MQTT] Message channel closed, stopping event loop");
                        return Ok(());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("[MQTT] Connection lost: {:?}", e);
                    return Err(DomicileError::ConnectionLost(e.to_string()));
                }
            }
        }
    }
}

/// Cloneable publish/subscribe handle over the rumqttc client.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    cancel: CancellationToken,
}

#[async_trait]
impl Bus for MqttBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(DomicileError::ShuttingDown("publish"));
        }

        debug!("[MQTT] Publishing to {}: {}", topic, String::from_utf8_lossy(payload));
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(DomicileError::ShuttingDown("subscribe"));
        }

        info!("[MQTT] Subscribing to topic: {}", topic);
        self.client.subscribe(topic, QoS::AtMostOnce).await?;
        Ok(())
    }
}
