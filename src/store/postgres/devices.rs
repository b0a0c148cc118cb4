use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::PostgresStore;
use crate::error::{DomicileError, Result};
use crate::model::{Device, NewDevice};
use crate::store::DeviceStore;

const DEVICE_COLUMNS: &str = "ieee_address, date_created, date_modified, date_code, friendly_name, \
     area_id, manufacturer, model_id, last_seen, device_type, battery, active";

#[async_trait]
impl DeviceStore for PostgresStore {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY ieee_address"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(devices)
    }

    async fn get_device(&self, ieee_address: &str) -> Result<Device> {
        sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE ieee_address = $1"
        ))
        .bind(ieee_address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DomicileError::not_found("device", ieee_address))
    }

    async fn create_device(&self, device: &NewDevice) -> Result<Device> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, Device>(&format!(
            "INSERT INTO devices \
                (ieee_address, date_created, date_modified, date_code, friendly_name, \
                 manufacturer, model_id, last_seen, device_type, active) \
             VALUES ($1, $2, $2, $3, $4, $5, $6, $7, $8, TRUE) \
             RETURNING {DEVICE_COLUMNS}"
        ))
        .bind(&device.ieee_address)
        .bind(now)
        .bind(&device.date_code)
        .bind(&device.friendly_name)
        .bind(&device.manufacturer)
        .bind(&device.model_id)
        .bind(device.last_seen)
        .bind(&device.device_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_device(&self, ieee_address: &str, name: &str, active: bool) -> Result<Device> {
        sqlx::query_as::<_, Device>(&format!(
            "UPDATE devices SET friendly_name = $1, active = $2, date_modified = $3 \
             WHERE ieee_address = $4 RETURNING {DEVICE_COLUMNS}"
        ))
        .bind(name)
        .bind(active)
        .bind(Utc::now())
        .bind(ieee_address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DomicileError::not_found("device", ieee_address))
    }

    async fn update_device_battery(
        &self,
        ieee_address: &str,
        battery: f64,
        seen_at: DateTime<Utc>,
    ) -> Result<Device> {
        sqlx::query_as::<_, Device>(&format!(
            "UPDATE devices SET date_modified = $1, last_seen = $1, battery = $2 \
             WHERE ieee_address = $3 RETURNING {DEVICE_COLUMNS}"
        ))
        .bind(seen_at)
        .bind(battery)
        .bind(ieee_address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DomicileError::not_found("device", ieee_address))
    }
}
