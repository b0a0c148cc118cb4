use async_trait::async_trait;
use uuid::Uuid;

use super::PostgresStore;
use crate::error::{DomicileError, Result};
use crate::model::Area;
use crate::store::AreaStore;

#[async_trait]
impl AreaStore for PostgresStore {
    async fn list_areas(&self) -> Result<Vec<Area>> {
        let areas = sqlx::query_as::<_, Area>(
            "SELECT id, uuid, date_created, name FROM areas ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(areas)
    }

    async fn get_area(&self, uuid: Uuid) -> Result<Area> {
        sqlx::query_as::<_, Area>("SELECT id, uuid, date_created, name FROM areas WHERE uuid = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DomicileError::not_found("area", uuid))
    }
}
