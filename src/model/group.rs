use chrono::{DateTime, Utc};
use serde::Serialize;

/// A zigbee2mqtt group. The id is assigned by the bridge, not by us.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub friendly_name: String,
    pub active: bool,
    /// Filled on demand for presentation, not stored on the group row.
    #[sqlx(skip)]
    pub members: Vec<GroupMember>,
}

/// Membership of one device in one group.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub group_id: i64,
    pub ieee_address: String,
    /// Resolved from the devices table when the member is a known device.
    pub friendly_name: Option<String>,
}
