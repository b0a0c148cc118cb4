//! Startup of the bus side.
//!
//! Wires the reconcilers, the telemetry router and the dispatcher together
//! and registers the two snapshot subscriptions that live for the whole
//! process.

use log::info;
use std::sync::Arc;

use crate::bus::{Bus, Topics};
use crate::config::Config;
use crate::error::Result;
use crate::reconcile::{DeviceReconciler, GroupReconciler};
use crate::router::{Dispatcher, Route, Subscriptions};
use crate::store::Stores;
use crate::telemetry::{TelemetryRouter, TemperaturePolicy};

pub struct Controller {
    bus: Arc<dyn Bus>,
    topics: Topics,
    subscriptions: Arc<Subscriptions>,
    dispatcher: Arc<Dispatcher>,
}

impl Controller {
    pub fn new(config: &Config, bus: Arc<dyn Bus>, stores: &Stores) -> Self {
        let topics = Topics::new(config.mqtt.topic_root.clone());
        let subscriptions = Arc::new(Subscriptions::new(bus.clone()));

        let devices = Arc::new(DeviceReconciler::new(
            stores.devices.clone(),
            subscriptions.clone(),
            topics.clone(),
        ));
        let groups = Arc::new(GroupReconciler::new(stores.groups.clone()));
        let telemetry = Arc::new(TelemetryRouter::new(
            stores.devices.clone(),
            stores.reports.clone(),
            TemperaturePolicy::from_config(&config.telemetry),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            subscriptions.clone(),
            devices,
            groups,
            telemetry,
        ));

        Self {
            bus,
            topics,
            subscriptions,
            dispatcher,
        }
    }

    /// Ask the bridge for a device snapshot, then subscribe to both
    /// snapshot topics. The bridge pushes the device list in response to
    /// the request; it is never polled.
    pub async fn start(&self) -> Result<()> {
        self.bus
            .publish(&self.topics.request_devices(), b"{}")
            .await?;
        info!("[Devices] Requested device snapshot");

        self.subscriptions
            .ensure_subscribed(&self.topics.devices(), Route::DeviceSnapshot)
            .await?;
        self.subscriptions
            .ensure_subscribed(&self.topics.groups(), Route::GroupSnapshot)
            .await?;

        info!(
            "[Router] Listening for snapshots under {}",
            self.topics.root()
        );
        Ok(())
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }
}
