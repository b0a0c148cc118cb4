use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{Route, Subscriptions};
use crate::bus::BusMessage;
use crate::reconcile::{DeviceReconciler, GroupReconciler};
use crate::telemetry::TelemetryRouter;

/// Routes bus messages to their handlers.
///
/// Every topic gets its own lane: messages on one topic are handled one at a
/// time in arrival order, different topics are handled concurrently.
pub struct Dispatcher {
    subscriptions: Arc<Subscriptions>,
    devices: Arc<DeviceReconciler>,
    groups: Arc<GroupReconciler>,
    telemetry: Arc<TelemetryRouter>,
}

impl Dispatcher {
    pub fn new(
        subscriptions: Arc<Subscriptions>,
        devices: Arc<DeviceReconciler>,
        groups: Arc<GroupReconciler>,
        telemetry: Arc<TelemetryRouter>,
    ) -> Self {
        Self {
            subscriptions,
            devices,
            groups,
            telemetry,
        }
    }

    /// Handle a single message. Failures are logged, never propagated.
    pub async fn handle(&self, msg: BusMessage) {
        let Some(route) = self.subscriptions.route(&msg.topic) else {
            debug!("[Router] No route for {}, dropping message", msg.topic);
            return;
        };

        match route {
            Route::DeviceSnapshot => {
                if let Err(e) = self.devices.reconcile(&msg.topic, &msg.payload).await {
                    error!("[Devices] Reconciliation aborted: {}", e);
                }
            }
            Route::GroupSnapshot => {
                if let Err(e) = self.groups.reconcile(&msg.topic, &msg.payload).await {
                    error!("[Groups] Reconciliation aborted: {}", e);
                }
            }
            Route::Telemetry { ieee_address } => {
                if let Err(e) = self
                    .telemetry
                    .handle(&ieee_address, &msg.topic, &msg.payload)
                    .await
                {
                    warn!("[Telemetry] Dropping message on {}: {}", msg.topic, e);
                }
            }
        }
    }

    /// Consume messages until `rx` closes or `cancel` fires.
    ///
    /// On return every lane has finished the message it was working on;
    /// messages still queued behind it are dropped.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<BusMessage>, cancel: CancellationToken) {
        info!("[Router] Dispatching bus messages");

        let tracker = TaskTracker::new();
        let mut lanes: HashMap<String, mpsc::UnboundedSender<BusMessage>> = HashMap::new();

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            let topic = msg.topic.clone();
            let lane = lanes
                .entry(topic.clone())
                .or_insert_with(|| self.clone().spawn_lane(&tracker, &topic, cancel.clone()));

            if let Err(mpsc::error::SendError(msg)) = lane.send(msg) {
                // The lane task died (a handler panicked); start a fresh one.
                warn!("[Router] Lane for {} stopped, restarting it", topic);
                let lane = self.clone().spawn_lane(&tracker, &topic, cancel.clone());
                if lane.send(msg).is_err() {
                    warn!("[Router] Restarted lane for {} is gone, dropping message", topic);
                }
                lanes.insert(topic, lane);
            }
        }

        drop(lanes);
        tracker.close();
        tracker.wait().await;
        info!("[Router] All lanes finished");
    }

    fn spawn_lane(
        self: Arc<Self>,
        tracker: &TaskTracker,
        topic: &str,
        cancel: CancellationToken,
    ) -> mpsc::UnboundedSender<BusMessage> {
        debug!("[Router] Opening lane for {}", topic);
        let (tx, mut rx) = mpsc::unbounded_channel::<BusMessage>();

        tracker.spawn(async move {
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                };
                self.handle(msg).await;
            }
        });

        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Topics;
    use crate::bus::recording::RecordingBus;
    use crate::model::ReportKind;
    use crate::store::Stores;
    use crate::store::memory::{self, MemoryStore};
    use crate::telemetry::TemperaturePolicy;

    struct Harness {
        store: Arc<MemoryStore>,
        dispatcher: Arc<Dispatcher>,
        subscriptions: Arc<Subscriptions>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::from_backend(store.clone());
        let bus = Arc::new(RecordingBus::new());
        let topics = Topics::new("zigbee2mqtt");
        let subscriptions = Arc::new(Subscriptions::new(bus));

        let dispatcher = Arc::new(Dispatcher::new(
            subscriptions.clone(),
            Arc::new(DeviceReconciler::new(
                stores.devices.clone(),
                subscriptions.clone(),
                topics.clone(),
            )),
            Arc::new(GroupReconciler::new(stores.groups.clone())),
            Arc::new(TelemetryRouter::new(
                stores.devices.clone(),
                stores.reports.clone(),
                TemperaturePolicy::default(),
            )),
        ));

        Harness {
            store,
            dispatcher,
            subscriptions,
        }
    }

    fn message(topic: &str, payload: &str) -> BusMessage {
        BusMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_unrouted_topic_is_ignored() {
        let h = harness();
        h.dispatcher
            .handle(message("zigbee2mqtt/nobody", r#"{"humidity": 40}"#))
            .await;
        assert!(h.store.journal().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_then_telemetry_end_to_end() {
        let h = harness();
        h.subscriptions
            .ensure_subscribed("zigbee2mqtt/bridge/devices", Route::DeviceSnapshot)
            .await
            .unwrap();

        h.dispatcher
            .handle(message(
                "zigbee2mqtt/bridge/devices",
                r#"[{"ieee_address": "0x01", "friendly_name": "Hall", "type": "EndDevice"}]"#,
            ))
            .await;
        h.store.set_area("0x01", Some(4));

        h.dispatcher
            .handle(message("zigbee2mqtt/Hall", r#"{"humidity": 48.5, "battery": 90}"#))
            .await;

        let reports = h.store.reports(ReportKind::Humidity);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].area_id, 4);
        assert_eq!(h.store.device("0x01").unwrap().battery, Some(90.0));
    }

    #[tokio::test]
    async fn test_run_processes_messages_until_channel_closes() {
        let h = harness();
        h.store.insert_device({
            let mut d = memory::device("0x01", "Hall", true);
            d.area_id = Some(1);
            d
        });
        h.subscriptions
            .ensure_subscribed(
                "zigbee2mqtt/Hall",
                Route::Telemetry {
                    ieee_address: "0x01".to_string(),
                },
            )
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel(8);
        let run = tokio::spawn(h.dispatcher.clone().run(rx, CancellationToken::new()));

        tx.send(message("zigbee2mqtt/Hall", "not json")).await.unwrap();
        tx.send(message("zigbee2mqtt/Hall", r#"{"pressure": 1012.0}"#))
            .await
            .unwrap();
        tx.send(message("zigbee2mqtt/Hall", r#"{"pressure": 1013.0}"#))
            .await
            .unwrap();
        drop(tx);
        run.await.unwrap();

        let values: Vec<f64> = h
            .store
            .reports(ReportKind::Pressure)
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![1012.0, 1013.0]);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let h = harness();
        let (_tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let run = tokio::spawn(h.dispatcher.clone().run(rx, cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), run)
            .await
            .expect("dispatcher did not stop")
            .unwrap();
    }
}
