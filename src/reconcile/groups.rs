use log::{info, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{ReconcileSummary, decode_snapshot};
use crate::error::Result;
use crate::model::{Group, GroupMember};
use crate::store::GroupStore;

/// One entry of the `bridge/groups` snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupDescriptor {
    pub id: i64,
    pub friendly_name: String,
    #[serde(default)]
    pub members: Vec<MemberDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemberDescriptor {
    pub ieee_address: String,
    pub endpoint: Option<u32>,
}

impl GroupDescriptor {
    /// Member addresses in snapshot order, each once. A device bound with
    /// several endpoints is listed once per endpoint by the bridge.
    pub fn member_addresses(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.members
            .iter()
            .map(|m| m.ieee_address.as_str())
            .filter(|address| seen.insert(*address))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// Members to add and remove so the stored set equals `incoming`.
pub fn diff_members(current: &[GroupMember], incoming: &[&str]) -> MembershipDiff {
    let current_set: HashSet<&str> = current.iter().map(|m| m.ieee_address.as_str()).collect();
    let incoming_set: HashSet<&str> = incoming.iter().copied().collect();

    MembershipDiff {
        add: incoming
            .iter()
            .filter(|address| !current_set.contains(*address))
            .map(|address| address.to_string())
            .collect(),
        remove: current
            .iter()
            .filter(|m| !incoming_set.contains(m.ieee_address.as_str()))
            .map(|m| m.ieee_address.clone())
            .collect(),
    }
}

/// Reconciles `bridge/groups` snapshots, including group membership.
pub struct GroupReconciler {
    store: Arc<dyn GroupStore>,
}

impl GroupReconciler {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, topic: &str, payload: &[u8]) -> Result<ReconcileSummary> {
        let snapshot = decode_snapshot::<GroupDescriptor>(topic, payload)?;
        let persisted = self.store.list_groups().await?;
        let by_id: HashMap<i64, &Group> = persisted.iter().map(|g| (g.id, g)).collect();

        let mut summary = ReconcileSummary {
            malformed: snapshot.rejected.len(),
            ..Default::default()
        };

        let mut present: HashSet<i64> = snapshot
            .rejected
            .iter()
            .filter_map(|entry| entry.get("id")?.as_i64())
            .collect();

        for descriptor in &snapshot.valid {
            if !present.insert(descriptor.id) {
                warn!("[Groups] Group {} listed twice, ignoring repeat", descriptor.id);
                continue;
            }

            let group_ready = match by_id.get(&descriptor.id) {
                Some(found) if !found.active || found.friendly_name != descriptor.friendly_name => {
                    self.update(descriptor.id, &descriptor.friendly_name, true, &mut summary)
                        .await;
                    true
                }
                Some(_) => true,
                None => self.create(descriptor, &mut summary).await,
            };

            if group_ready {
                self.reconcile_members(descriptor, &mut summary).await;
            }
        }

        for group in &persisted {
            if group.active && !present.contains(&group.id) {
                self.update(group.id, &group.friendly_name, false, &mut summary)
                    .await;
            }
        }

        info!(
            "[Groups] Reconciled {} group(s): {}",
            snapshot.valid.len(),
            summary
        );
        Ok(summary)
    }

    async fn create(&self, descriptor: &GroupDescriptor, summary: &mut ReconcileSummary) -> bool {
        match self
            .store
            .create_group(descriptor.id, &descriptor.friendly_name)
            .await
        {
            Ok(group) => {
                info!("[Groups] Created {} ({})", group.friendly_name, group.id);
                summary.created += 1;
                true
            }
            Err(e) => {
                warn!("[Groups] Failed to create group {}: {}", descriptor.id, e);
                summary.failed += 1;
                false
            }
        }
    }

    async fn update(&self, id: i64, name: &str, active: bool, summary: &mut ReconcileSummary) {
        match self.store.update_group(id, name, active).await {
            Ok(_) if active => {
                info!("[Groups] Updated {} ({})", name, id);
                summary.updated += 1;
            }
            Ok(_) => {
                info!("[Groups] Marked {} ({}) inactive", name, id);
                summary.deactivated += 1;
            }
            Err(e) => {
                warn!("[Groups] Failed to update group {}: {}", id, e);
                summary.failed += 1;
            }
        }
    }

    /// Converge one group's membership. Failures stay local to this group.
    async fn reconcile_members(&self, descriptor: &GroupDescriptor, summary: &mut ReconcileSummary) {
        let current = match self.store.list_group_members(descriptor.id).await {
            Ok(members) => members,
            Err(e) => {
                warn!(
                    "[Groups] Skipping membership of group {}: {}",
                    descriptor.id, e
                );
                summary.failed += 1;
                return;
            }
        };

        let diff = diff_members(&current, &descriptor.member_addresses());

        for address in &diff.add {
            match self.store.create_group_member(descriptor.id, address).await {
                Ok(_) => summary.members_added += 1,
                Err(e) => {
                    warn!(
                        "[Groups] Failed to add {} to group {}: {}",
                        address, descriptor.id, e
                    );
                    summary.failed += 1;
                }
            }
        }

        for address in &diff.remove {
            match self.store.delete_group_member(descriptor.id, address).await {
                Ok(()) => summary.members_removed += 1,
                Err(e) => {
                    warn!(
                        "[Groups] Failed to remove {} from group {}: {}",
                        address, descriptor.id, e
                    );
                    summary.failed += 1;
                }
            }
        }
    }
}
