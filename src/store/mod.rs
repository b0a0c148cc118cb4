//! Persistence seams.
//!
//! The reconcilers and the telemetry router only talk to these traits. The
//! PostgreSQL implementation lives in [`postgres`]; tests run against the
//! in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    Area, Device, Group, GroupMember, NewDevice, NewReport, Report, ReportKind, ReportRange,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<Device>>;

    /// Fails with `NotFound` for an unknown address.
    async fn get_device(&self, ieee_address: &str) -> Result<Device>;

    /// Inserts an active device.
    async fn create_device(&self, device: &NewDevice) -> Result<Device>;

    async fn update_device(&self, ieee_address: &str, name: &str, active: bool) -> Result<Device>;

    /// Records a battery level and stamps `last_seen` / `date_modified` with `seen_at`.
    async fn update_device_battery(
        &self,
        ieee_address: &str,
        battery: f64,
        seen_at: DateTime<Utc>,
    ) -> Result<Device>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn get_group(&self, id: i64) -> Result<Group>;

    /// Inserts an active group under the bridge-assigned id.
    async fn create_group(&self, id: i64, name: &str) -> Result<Group>;

    async fn update_group(&self, id: i64, name: &str, active: bool) -> Result<Group>;

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>>;

    async fn create_group_member(&self, group_id: i64, ieee_address: &str)
    -> Result<GroupMember>;

    async fn delete_group_member(&self, group_id: i64, ieee_address: &str) -> Result<()>;
}

#[async_trait]
pub trait AreaStore: Send + Sync {
    async fn list_areas(&self) -> Result<Vec<Area>>;

    async fn get_area(&self, uuid: Uuid) -> Result<Area>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(&self, report: &NewReport) -> Result<Report>;

    /// Reports of one kind for an area, ascending by date.
    async fn list_reports(
        &self,
        kind: ReportKind,
        area_id: i64,
        range: ReportRange,
    ) -> Result<Vec<Report>>;
}

/// Handles to every store, cloned into each component that needs one.
#[derive(Clone)]
pub struct Stores {
    pub devices: Arc<dyn DeviceStore>,
    pub groups: Arc<dyn GroupStore>,
    pub areas: Arc<dyn AreaStore>,
    pub reports: Arc<dyn ReportStore>,
}

impl Stores {
    /// Use one backend for all four stores.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: DeviceStore + GroupStore + AreaStore + ReportStore + 'static,
    {
        Self {
            devices: backend.clone(),
            groups: backend.clone(),
            areas: backend.clone(),
            reports: backend,
        }
    }
}
