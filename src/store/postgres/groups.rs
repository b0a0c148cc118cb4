use async_trait::async_trait;
use chrono::Utc;

use super::PostgresStore;
use crate::error::{DomicileError, Result};
use crate::model::{Group, GroupMember};
use crate::store::GroupStore;

const GROUP_COLUMNS: &str = "id, date_created, date_modified, friendly_name, active";

#[async_trait]
impl GroupStore for PostgresStore {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn get_group(&self, id: i64) -> Result<Group> {
        sqlx::query_as::<_, Group>(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DomicileError::not_found("group", id))
    }

    async fn create_group(&self, id: i64, name: &str) -> Result<Group> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "INSERT INTO groups (id, date_created, date_modified, friendly_name, active) \
             VALUES ($1, $2, $2, $3, TRUE) RETURNING {GROUP_COLUMNS}"
        ))
        .bind(id)
        .bind(Utc::now())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    async fn update_group(&self, id: i64, name: &str, active: bool) -> Result<Group> {
        sqlx::query_as::<_, Group>(&format!(
            "UPDATE groups SET friendly_name = $1, active = $2, date_modified = $3 \
             WHERE id = $4 RETURNING {GROUP_COLUMNS}"
        ))
        .bind(name)
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DomicileError::not_found("group", id))
    }

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT gd.group_id, gd.ieee_address, d.friendly_name \
             FROM groups_devices gd \
             LEFT JOIN devices d ON d.ieee_address = gd.ieee_address \
             WHERE gd.group_id = $1 \
             ORDER BY gd.ieee_address",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn create_group_member(
        &self,
        group_id: i64,
        ieee_address: &str,
    ) -> Result<GroupMember> {
        let member = sqlx::query_as::<_, GroupMember>(
            "WITH inserted AS ( \
                INSERT INTO groups_devices (group_id, ieee_address) VALUES ($1, $2) \
                RETURNING group_id, ieee_address \
             ) \
             SELECT i.group_id, i.ieee_address, d.friendly_name \
             FROM inserted i LEFT JOIN devices d ON d.ieee_address = i.ieee_address",
        )
        .bind(group_id)
        .bind(ieee_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    async fn delete_group_member(&self, group_id: i64, ieee_address: &str) -> Result<()> {
        sqlx::query("DELETE FROM groups_devices WHERE group_id = $1 AND ieee_address = $2")
            .bind(group_id)
            .bind(ieee_address)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
