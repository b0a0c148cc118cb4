use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A physical location that scopes sensor reports.
///
/// Areas are managed outside this crate; devices and reports only point at
/// them through `id`. The `uuid` is what the HTTP surface exposes.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: i64,
    pub uuid: Uuid,
    pub date_created: DateTime<Utc>,
    pub name: String,
}
