//! Snapshot reconciliation.
//!
//! zigbee2mqtt periodically pushes the complete list of devices and groups.
//! Each snapshot is diffed against what is persisted and only the difference
//! is written. Every write is independent: a cycle that dies halfway leaves
//! state the next snapshot will finish converging.

mod devices;
mod groups;

use log::warn;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::error::{DomicileError, Result};

pub use devices::{DeviceAction, DeviceDescriptor, DeviceReconciler, LastSeen, plan_devices};
pub use groups::{GroupDescriptor, GroupReconciler, MemberDescriptor, MembershipDiff, diff_members};

/// A decoded snapshot. Entries that failed validation are kept raw so the
/// reconcilers can still tell which identities were present.
#[derive(Debug)]
pub(crate) struct Snapshot<T> {
    pub valid: Vec<T>,
    pub rejected: Vec<serde_json::Value>,
}

/// Decode a snapshot payload, validating each entry on its own.
///
/// A payload that is not a JSON array fails as a whole; a single bad entry
/// is logged and set aside.
pub(crate) fn decode_snapshot<T: DeserializeOwned>(topic: &str, payload: &[u8]) -> Result<Snapshot<T>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(payload).map_err(|e| DomicileError::malformed(topic, e))?;

    let mut snapshot = Snapshot {
        valid: Vec::with_capacity(entries.len()),
        rejected: Vec::new(),
    };

    for entry in entries {
        match T::deserialize(&entry) {
            Ok(item) => snapshot.valid.push(item),
            Err(e) => {
                warn!("[{}] Skipping malformed entry: {} ({})", topic, e, entry);
                snapshot.rejected.push(entry);
            }
        }
    }

    Ok(snapshot)
}

/// Write counts for one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub deactivated: usize,
    pub members_added: usize,
    pub members_removed: usize,
    /// Entries rejected at decode time.
    pub malformed: usize,
    /// Individual writes that failed and were skipped.
    pub failed: usize,
}

impl ReconcileSummary {
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deactivated + self.members_added + self.members_removed
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deactivated, +{}/-{} members, {} malformed, {} failed",
            self.created,
            self.updated,
            self.deactivated,
            self.members_added,
            self.members_removed,
            self.malformed,
            self.failed
        )
    }
}
