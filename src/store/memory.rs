//! In-memory store used by the unit tests.
//!
//! Keeps every write in an ordered journal so tests can assert exactly which
//! persistence calls a reconciliation cycle issued.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::{AreaStore, DeviceStore, GroupStore, ReportStore};
use crate::error::{DomicileError, Result};
use crate::model::{
    Area, Device, Group, GroupMember, NewDevice, NewReport, Report, ReportKind, ReportRange,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    CreateDevice(String),
    UpdateDevice { address: String, name: String, active: bool },
    UpdateBattery { address: String, battery: f64 },
    CreateGroup(i64),
    UpdateGroup { id: i64, name: String, active: bool },
    CreateMember { group_id: i64, address: String },
    DeleteMember { group_id: i64, address: String },
    CreateReport(ReportKind),
}

#[derive(Default)]
struct State {
    devices: BTreeMap<String, Device>,
    groups: BTreeMap<i64, Group>,
    members: BTreeMap<i64, Vec<String>>,
    areas: Vec<Area>,
    reports: Vec<(ReportKind, Report)>,
    journal: Vec<Write>,
    fail_device_listing: bool,
    fail_battery_updates: bool,
    failing_member_groups: HashSet<i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_device(&self, device: Device) {
        self.state
            .lock()
            .devices
            .insert(device.ieee_address.clone(), device);
    }

    pub fn insert_group(&self, group: Group, members: &[&str]) {
        let mut state = self.state.lock();
        state
            .members
            .insert(group.id, members.iter().map(|m| m.to_string()).collect());
        state.groups.insert(group.id, group);
    }

    pub fn insert_area(&self, area: Area) {
        self.state.lock().areas.push(area);
    }

    pub fn insert_report(&self, kind: ReportKind, report: Report) {
        self.state.lock().reports.push((kind, report));
    }

    pub fn set_area(&self, address: &str, area_id: Option<i64>) {
        if let Some(device) = self.state.lock().devices.get_mut(address) {
            device.area_id = area_id;
        }
    }

    pub fn fail_device_listing(&self) {
        self.state.lock().fail_device_listing = true;
    }

    pub fn fail_battery_updates(&self) {
        self.state.lock().fail_battery_updates = true;
    }

    pub fn fail_membership_for(&self, group_id: i64) {
        self.state.lock().failing_member_groups.insert(group_id);
    }

    pub fn journal(&self) -> Vec<Write> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    pub fn device(&self, address: &str) -> Option<Device> {
        self.state.lock().devices.get(address).cloned()
    }

    pub fn group(&self, id: i64) -> Option<Group> {
        self.state.lock().groups.get(&id).cloned()
    }

    pub fn member_addresses(&self, group_id: i64) -> Vec<String> {
        let mut members = self
            .state
            .lock()
            .members
            .get(&group_id)
            .cloned()
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn reports(&self, kind: ReportKind) -> Vec<Report> {
        self.state
            .lock()
            .reports
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

/// A persisted-looking device for seeding tests.
pub fn device(address: &str, name: &str, active: bool) -> Device {
    let now = Utc::now();
    Device {
        ieee_address: address.to_string(),
        date_created: now,
        date_modified: now,
        date_code: None,
        friendly_name: name.to_string(),
        area_id: None,
        manufacturer: None,
        model_id: None,
        last_seen: None,
        device_type: Some("EndDevice".to_string()),
        battery: None,
        active,
    }
}

pub fn group(id: i64, name: &str, active: bool) -> Group {
    let now = Utc::now();
    Group {
        id,
        date_created: now,
        date_modified: now,
        friendly_name: name.to_string(),
        active,
        members: Vec::new(),
    }
}

pub fn area(id: i64, name: &str) -> Area {
    Area {
        id,
        uuid: Uuid::new_v4(),
        date_created: Utc::now(),
        name: name.to_string(),
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let state = self.state.lock();
        if state.fail_device_listing {
            return Err(DomicileError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(state.devices.values().cloned().collect())
    }

    async fn get_device(&self, ieee_address: &str) -> Result<Device> {
        self.device(ieee_address)
            .ok_or_else(|| DomicileError::not_found("device", ieee_address))
    }

    async fn create_device(&self, new: &NewDevice) -> Result<Device> {
        let mut state = self.state.lock();
        if state.devices.contains_key(&new.ieee_address) {
            return Err(DomicileError::Database(sqlx::Error::Protocol(format!(
                "duplicate key {}",
                new.ieee_address
            ))));
        }

        let mut created = device(&new.ieee_address, &new.friendly_name, true);
        created.date_code = new.date_code.clone();
        created.manufacturer = new.manufacturer.clone();
        created.model_id = new.model_id.clone();
        created.last_seen = new.last_seen;
        created.device_type = new.device_type.clone();

        state
            .devices
            .insert(created.ieee_address.clone(), created.clone());
        state
            .journal
            .push(Write::CreateDevice(new.ieee_address.clone()));
        Ok(created)
    }

    async fn update_device(&self, ieee_address: &str, name: &str, active: bool) -> Result<Device> {
        let mut state = self.state.lock();
        let device = state
            .devices
            .get_mut(ieee_address)
            .ok_or_else(|| DomicileError::not_found("device", ieee_address))?;
        device.friendly_name = name.to_string();
        device.active = active;
        device.date_modified = Utc::now();
        let updated = device.clone();

        state.journal.push(Write::UpdateDevice {
            address: ieee_address.to_string(),
            name: name.to_string(),
            active,
        });
        Ok(updated)
    }

    async fn update_device_battery(
        &self,
        ieee_address: &str,
        battery: f64,
        seen_at: DateTime<Utc>,
    ) -> Result<Device> {
        let mut state = self.state.lock();
        if state.fail_battery_updates {
            return Err(DomicileError::Database(sqlx::Error::PoolTimedOut));
        }
        let device = state
            .devices
            .get_mut(ieee_address)
            .ok_or_else(|| DomicileError::not_found("device", ieee_address))?;
        device.battery = Some(battery);
        device.last_seen = Some(seen_at);
        device.date_modified = seen_at;
        let updated = device.clone();

        state.journal.push(Write::UpdateBattery {
            address: ieee_address.to_string(),
            battery,
        });
        Ok(updated)
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.state.lock().groups.values().cloned().collect())
    }

    async fn get_group(&self, id: i64) -> Result<Group> {
        self.group(id)
            .ok_or_else(|| DomicileError::not_found("group", id))
    }

    async fn create_group(&self, id: i64, name: &str) -> Result<Group> {
        let mut state = self.state.lock();
        let created = group(id, name, true);
        state.groups.insert(id, created.clone());
        state.journal.push(Write::CreateGroup(id));
        Ok(created)
    }

    async fn update_group(&self, id: i64, name: &str, active: bool) -> Result<Group> {
        let mut state = self.state.lock();
        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| DomicileError::not_found("group", id))?;
        group.friendly_name = name.to_string();
        group.active = active;
        let updated = group.clone();

        state.journal.push(Write::UpdateGroup {
            id,
            name: name.to_string(),
            active,
        });
        Ok(updated)
    }

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        let state = self.state.lock();
        if state.failing_member_groups.contains(&group_id) {
            return Err(DomicileError::Database(sqlx::Error::PoolTimedOut));
        }

        let members = state
            .members
            .get(&group_id)
            .map(|addresses| {
                addresses
                    .iter()
                    .map(|address| GroupMember {
                        group_id,
                        ieee_address: address.clone(),
                        friendly_name: state
                            .devices
                            .get(address)
                            .map(|d| d.friendly_name.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(members)
    }

    async fn create_group_member(
        &self,
        group_id: i64,
        ieee_address: &str,
    ) -> Result<GroupMember> {
        let mut state = self.state.lock();
        state
            .members
            .entry(group_id)
            .or_default()
            .push(ieee_address.to_string());
        state.journal.push(Write::CreateMember {
            group_id,
            address: ieee_address.to_string(),
        });

        Ok(GroupMember {
            group_id,
            ieee_address: ieee_address.to_string(),
            friendly_name: state
                .devices
                .get(ieee_address)
                .map(|d| d.friendly_name.clone()),
        })
    }

    async fn delete_group_member(&self, group_id: i64, ieee_address: &str) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(members) = state.members.get_mut(&group_id) {
            members.retain(|m| m != ieee_address);
        }
        state.journal.push(Write::DeleteMember {
            group_id,
            address: ieee_address.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl AreaStore for MemoryStore {
    async fn list_areas(&self) -> Result<Vec<Area>> {
        Ok(self.state.lock().areas.clone())
    }

    async fn get_area(&self, uuid: Uuid) -> Result<Area> {
        self.state
            .lock()
            .areas
            .iter()
            .find(|a| a.uuid == uuid)
            .cloned()
            .ok_or_else(|| DomicileError::not_found("area", uuid))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create_report(&self, report: &NewReport) -> Result<Report> {
        let mut state = self.state.lock();
        let kind = report.reading.kind();
        let created = report.clone().into_report();
        state.reports.push((kind, created.clone()));
        state.journal.push(Write::CreateReport(kind));
        Ok(created)
    }

    async fn list_reports(
        &self,
        kind: ReportKind,
        area_id: i64,
        range: ReportRange,
    ) -> Result<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .state
            .lock()
            .reports
            .iter()
            .filter(|(k, r)| *k == kind && r.area_id == area_id && range.contains(r.date))
            .map(|(_, r)| r.clone())
            .collect();
        reports.sort_by_key(|r| r.date);
        Ok(reports)
    }
}
