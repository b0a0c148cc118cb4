use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{ReconcileSummary, decode_snapshot};
use crate::bus::Topics;
use crate::error::Result;
use crate::model::{Device, DeviceCategory, NewDevice};
use crate::router::{Route, Subscriptions};
use crate::store::DeviceStore;

/// One entry of the `bridge/devices` snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceDescriptor {
    pub ieee_address: String,
    pub friendly_name: String,
    /// Raw `type` value, persisted as reported.
    #[serde(rename = "type")]
    pub device_type: String,
    pub date_code: Option<String>,
    pub manufacturer: Option<String>,
    pub model_id: Option<String>,
    pub last_seen: Option<LastSeen>,
}

/// zigbee2mqtt reports `last_seen` as epoch milliseconds or as an ISO 8601
/// string depending on its `last_seen` setting.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LastSeen {
    EpochMillis(i64),
    Timestamp(DateTime<Utc>),
}

impl LastSeen {
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        match self {
            LastSeen::EpochMillis(ms) => DateTime::from_timestamp_millis(ms),
            LastSeen::Timestamp(at) => Some(at),
        }
    }
}

impl DeviceDescriptor {
    pub fn category(&self) -> DeviceCategory {
        DeviceCategory::from_type(&self.device_type)
    }

    fn to_new_device(&self) -> NewDevice {
        NewDevice {
            ieee_address: self.ieee_address.clone(),
            date_code: self.date_code.clone(),
            friendly_name: self.friendly_name.clone(),
            manufacturer: self.manufacturer.clone(),
            model_id: self.model_id.clone(),
            last_seen: self.last_seen.and_then(LastSeen::to_datetime),
            device_type: Some(self.device_type.clone()),
        }
    }
}

/// What a snapshot entry, or a persisted device missing from it, turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAction {
    /// Known and unchanged; only its subscription is ensured.
    Keep { ieee_address: String, name: String },
    /// Known but renamed or previously inactive.
    Update { ieee_address: String, name: String },
    Create(NewDevice),
    /// The bridge itself.
    SkipCoordinator { ieee_address: String },
    /// Persisted as active but absent from the snapshot.
    Deactivate { ieee_address: String, name: String },
}

/// Diff a snapshot against the persisted devices.
///
/// `also_present` lists addresses of entries that failed validation: they
/// are neither created nor updated, but they are not deactivated either.
pub fn plan_devices(
    persisted: &[Device],
    incoming: &[DeviceDescriptor],
    also_present: &HashSet<String>,
) -> Vec<DeviceAction> {
    let by_address: HashMap<&str, &Device> = persisted
        .iter()
        .map(|d| (d.ieee_address.as_str(), d))
        .collect();

    let mut handled: HashSet<&str> = HashSet::with_capacity(incoming.len());
    let mut actions = Vec::with_capacity(incoming.len());

    for descriptor in incoming {
        let address = descriptor.ieee_address.as_str();
        if !handled.insert(address) {
            continue;
        }

        let action = match by_address.get(address) {
            Some(found) if !found.active || found.friendly_name != descriptor.friendly_name => {
                DeviceAction::Update {
                    ieee_address: descriptor.ieee_address.clone(),
                    name: descriptor.friendly_name.clone(),
                }
            }
            Some(_) => DeviceAction::Keep {
                ieee_address: descriptor.ieee_address.clone(),
                name: descriptor.friendly_name.clone(),
            },
            None if !descriptor.category().is_managed() => DeviceAction::SkipCoordinator {
                ieee_address: descriptor.ieee_address.clone(),
            },
            None => DeviceAction::Create(descriptor.to_new_device()),
        };
        actions.push(action);
    }

    for device in persisted {
        let address = device.ieee_address.as_str();
        if device.active && !handled.contains(address) && !also_present.contains(address) {
            actions.push(DeviceAction::Deactivate {
                ieee_address: device.ieee_address.clone(),
                name: device.friendly_name.clone(),
            });
        }
    }

    actions
}

/// Reconciles `bridge/devices` snapshots and keeps per-device telemetry
/// subscriptions in place.
pub struct DeviceReconciler {
    store: Arc<dyn DeviceStore>,
    subscriptions: Arc<Subscriptions>,
    topics: Topics,
}

impl DeviceReconciler {
    pub fn new(store: Arc<dyn DeviceStore>, subscriptions: Arc<Subscriptions>, topics: Topics) -> Self {
        Self {
            store,
            subscriptions,
            topics,
        }
    }

    /// Run one reconciliation cycle for a snapshot payload.
    ///
    /// Fails only when the payload is not a list or the persisted baseline
    /// cannot be fetched; individual write failures are logged and counted.
    pub async fn reconcile(&self, topic: &str, payload: &[u8]) -> Result<ReconcileSummary> {
        let snapshot = decode_snapshot::<DeviceDescriptor>(topic, payload)?;
        let persisted = self.store.list_devices().await?;

        let also_present: HashSet<String> = snapshot
            .rejected
            .iter()
            .filter_map(|entry| entry.get("ieee_address")?.as_str().map(String::from))
            .collect();

        let mut summary = ReconcileSummary {
            malformed: snapshot.rejected.len(),
            ..Default::default()
        };

        for action in plan_devices(&persisted, &snapshot.valid, &also_present) {
            self.apply(action, &mut summary).await;
        }

        info!(
            "[Devices] Reconciled {} device(s): {}",
            snapshot.valid.len(),
            summary
        );
        Ok(summary)
    }

    async fn apply(&self, action: DeviceAction, summary: &mut ReconcileSummary) {
        match action {
            DeviceAction::Keep { ieee_address, name } => {
                self.subscribe(&ieee_address, &name).await;
            }
            DeviceAction::Update { ieee_address, name } => {
                match self.store.update_device(&ieee_address, &name, true).await {
                    Ok(_) => {
                        info!("[Devices] Updated {} ({})", name, ieee_address);
                        summary.updated += 1;
                    }
                    Err(e) => {
                        warn!("[Devices] Failed to update {}: {}", ieee_address, e);
                        summary.failed += 1;
                    }
                }
                self.subscribe(&ieee_address, &name).await;
            }
            DeviceAction::Create(new_device) => match self.store.create_device(&new_device).await {
                Ok(device) => {
                    info!(
                        "[Devices] Created {} ({})",
                        device.friendly_name, device.ieee_address
                    );
                    summary.created += 1;
                    self.subscribe(&device.ieee_address, &device.friendly_name)
                        .await;
                }
                Err(e) => {
                    warn!(
                        "[Devices] Failed to create {}: {}",
                        new_device.ieee_address, e
                    );
                    summary.failed += 1;
                }
            },
            DeviceAction::SkipCoordinator { ieee_address } => {
                debug!("[Devices] Ignoring coordinator {}", ieee_address);
            }
            DeviceAction::Deactivate { ieee_address, name } => {
                match self.store.update_device(&ieee_address, &name, false).await {
                    Ok(_) => {
                        info!("[Devices] Marked {} ({}) inactive", name, ieee_address);
                        summary.deactivated += 1;
                    }
                    Err(e) => {
                        warn!("[Devices] Failed to deactivate {}: {}", ieee_address, e);
                        summary.failed += 1;
                    }
                }
            }
        }
    }

    async fn subscribe(&self, ieee_address: &str, name: &str) {
        let route = Route::Telemetry {
            ieee_address: ieee_address.to_string(),
        };
        if let Err(e) = self
            .subscriptions
            .ensure_subscribed(&self.topics.device(name), route)
            .await
        {
            warn!("[Devices] Could not subscribe to {}: {}", name, e);
        }
    }
}
