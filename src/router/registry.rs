use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bus::Bus;
use crate::error::Result;

/// What a subscribed topic is handled by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    DeviceSnapshot,
    GroupSnapshot,
    /// Telemetry of the device with this IEEE address.
    Telemetry { ieee_address: String },
}

/// Live topic → route table.
///
/// Entries are only ever added or re-pointed, never removed: a device that
/// goes inactive keeps its telemetry subscription.
pub struct Subscriptions {
    bus: Arc<dyn Bus>,
    routes: RwLock<HashMap<String, Route>>,
}

impl Subscriptions {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self {
            bus,
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Make sure `topic` is subscribed at the broker and routed to `route`.
    ///
    /// Returns `true` when a broker subscription was issued. A topic that is
    /// already registered is never subscribed twice; if it now belongs to a
    /// different route (a friendly name moved to another device) only the
    /// route is updated.
    pub async fn ensure_subscribed(&self, topic: &str, route: Route) -> Result<bool> {
        {
            let mut routes = self.routes.write();
            match routes.get_mut(topic) {
                Some(existing) if *existing == route => return Ok(false),
                Some(existing) => {
                    debug!("[Router] Re-routing {} from {:?} to {:?}", topic, existing, route);
                    *existing = route;
                    return Ok(false);
                }
                None => {
                    routes.insert(topic.to_string(), route);
                }
            }
        }

        if let Err(e) = self.bus.subscribe(topic).await {
            warn!("[Router] Subscribe to {} failed: {}", topic, e);
            self.routes.write().remove(topic);
            return Err(e);
        }

        Ok(true)
    }

    pub fn route(&self, topic: &str) -> Option<Route> {
        self.routes.read().get(topic).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}
