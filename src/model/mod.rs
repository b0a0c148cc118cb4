//! Persisted records shared by the reconcilers, the telemetry router and
//! the HTTP surface.

mod area;
mod device;
mod group;
mod report;

pub use area::Area;
pub use device::{Device, DeviceCategory, NewDevice};
pub use group::{Group, GroupMember};
pub use report::{NewReport, Reading, Report, ReportKind, ReportRange};
