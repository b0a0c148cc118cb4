//! Per-device telemetry handling.
//!
//! A device publishes its state on `<root>/<friendly name>`. The router picks
//! out the measurement fields it knows, records them as reports against the
//! device's area and keeps the device's battery level current.

use chrono::Utc;
use log::{debug, warn};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::TelemetryConfig;
use crate::error::{DomicileError, Result};
use crate::model::{Device, NewReport, Reading};
use crate::store::{DeviceStore, ReportStore};

/// Decides which devices may contribute temperature reports.
///
/// Many non-weather devices (plugs, bulbs, switches) report an internal chip
/// temperature that does not belong in the room series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperaturePolicy {
    model_ids: Vec<String>,
}

impl TemperaturePolicy {
    pub fn new(model_ids: Vec<String>) -> Self {
        Self { model_ids }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.weather_model_ids.clone())
    }

    pub fn accepts(&self, model_id: Option<&str>) -> bool {
        model_id.is_some_and(|model| self.model_ids.iter().any(|m| m == model))
    }
}

impl Default for TemperaturePolicy {
    fn default() -> Self {
        Self::new(vec!["lumi.weather".to_string()])
    }
}

/// The telemetry fields this crate understands. Everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelemetryPayload {
    pub battery: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub illuminance: Option<f64>,
    pub illuminance_lux: Option<f64>,
}

impl TelemetryPayload {
    /// Readings to record for a device, after model gating.
    pub fn readings(&self, device: &Device, policy: &TemperaturePolicy) -> Vec<Reading> {
        let mut readings = Vec::new();

        if let Some(value) = self.temperature {
            if policy.accepts(device.model_id.as_deref()) {
                readings.push(Reading::Temperature(value));
            } else {
                debug!(
                    "[Telemetry] Ignoring temperature from {} (model {:?})",
                    device.friendly_name, device.model_id
                );
            }
        }
        if let Some(value) = self.humidity {
            readings.push(Reading::Humidity(value));
        }
        if let Some(value) = self.pressure {
            readings.push(Reading::Pressure(value));
        }
        if let (Some(raw), Some(lux)) = (self.illuminance, self.illuminance_lux) {
            readings.push(Reading::Illuminance { raw, lux });
        }

        readings
    }
}

/// Outcome of one telemetry message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryOutcome {
    pub battery_updated: bool,
    pub battery_failed: bool,
    pub reports_created: usize,
    pub reports_failed: usize,
}

pub struct TelemetryRouter {
    devices: Arc<dyn DeviceStore>,
    reports: Arc<dyn ReportStore>,
    policy: TemperaturePolicy,
}

impl TelemetryRouter {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        reports: Arc<dyn ReportStore>,
        policy: TemperaturePolicy,
    ) -> Self {
        Self {
            devices,
            reports,
            policy,
        }
    }

    /// Handle one message from the device with `ieee_address`.
    ///
    /// The device row is read fresh for every message so area assignments
    /// made elsewhere take effect immediately.
    pub async fn handle(
        &self,
        ieee_address: &str,
        topic: &str,
        payload: &[u8],
    ) -> Result<TelemetryOutcome> {
        let mut outcome = TelemetryOutcome::default();
        if payload.is_empty() {
            return Ok(outcome);
        }

        let telemetry: TelemetryPayload =
            serde_json::from_slice(payload).map_err(|e| DomicileError::malformed(topic, e))?;
        let device = self.devices.get_device(ieee_address).await?;

        if let Some(battery) = telemetry.battery {
            match self
                .devices
                .update_device_battery(ieee_address, battery, Utc::now())
                .await
            {
                Ok(_) => outcome.battery_updated = true,
                Err(e) => {
                    warn!(
                        "[Telemetry] Failed to update battery of {}: {}",
                        device.friendly_name, e
                    );
                    outcome.battery_failed = true;
                }
            }
        }

        let Some(area_id) = device.area_id else {
            debug!(
                "[Telemetry] {} has no area, not recording reports",
                device.friendly_name
            );
            return Ok(outcome);
        };

        let received_at = Utc::now();
        for reading in telemetry.readings(&device, &self.policy) {
            let report = NewReport {
                device_address: device.ieee_address.clone(),
                area_id,
                date: received_at,
                reading,
            };

            match self.reports.create_report(&report).await {
                Ok(_) => outcome.reports_created += 1,
                Err(e) => {
                    warn!(
                        "[Telemetry] Failed to record {} for {}: {}",
                        reading.kind(),
                        device.friendly_name,
                        e
                    );
                    outcome.reports_failed += 1;
                }
            }
        }

        debug!(
            "[Telemetry] {}: {} report(s) recorded",
            device.friendly_name, outcome.reports_created
        );
        Ok(outcome)
    }
}
