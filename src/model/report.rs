use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The four sensor series this crate records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ReportKind {
    Temperature,
    Humidity,
    Pressure,
    Illuminance,
}

impl ReportKind {
    pub fn table(self) -> &'static str {
        match self {
            ReportKind::Temperature => "temperature_reports",
            ReportKind::Humidity => "humidity_reports",
            ReportKind::Pressure => "pressure_reports",
            ReportKind::Illuminance => "illuminance_reports",
        }
    }
}

/// A single typed measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Degrees Celsius
    Temperature(f64),
    /// Percent relative humidity
    Humidity(f64),
    /// Hectopascals
    Pressure(f64),
    /// Raw sensor value together with its lux conversion
    Illuminance { raw: f64, lux: f64 },
}

impl Reading {
    pub fn kind(&self) -> ReportKind {
        match self {
            Reading::Temperature(_) => ReportKind::Temperature,
            Reading::Humidity(_) => ReportKind::Humidity,
            Reading::Pressure(_) => ReportKind::Pressure,
            Reading::Illuminance { .. } => ReportKind::Illuminance,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Reading::Temperature(v) | Reading::Humidity(v) | Reading::Pressure(v) => v,
            Reading::Illuminance { raw, .. } => raw,
        }
    }

    pub fn value_lux(&self) -> Option<f64> {
        match *self {
            Reading::Illuminance { lux, .. } => Some(lux),
            _ => None,
        }
    }
}

/// An append-only report row.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "ieeeAddr")]
    #[sqlx(rename = "device_id")]
    pub device_address: String,
    pub area_id: i64,
    pub date: DateTime<Utc>,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_lux: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub device_address: String,
    pub area_id: i64,
    pub date: DateTime<Utc>,
    pub reading: Reading,
}

impl NewReport {
    pub fn into_report(self) -> Report {
        Report {
            device_address: self.device_address,
            area_id: self.area_id,
            date: self.date,
            value: self.reading.value(),
            value_lux: self.reading.value_lux(),
        }
    }
}

/// Inclusive time window for report queries. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReportRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}
