use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use log::{info, warn};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::command::GroupCommand;
use crate::error::Result;
use crate::model::Group;
use crate::store::Stores;

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    pub group: Option<String>,
}

/// Every group with its members filled in. A group whose members cannot be
/// read is listed without them.
pub(crate) async fn groups_with_members(stores: &Stores) -> Result<Vec<Group>> {
    let mut groups = stores.groups.list_groups().await?;

    for group in &mut groups {
        match stores.groups.list_group_members(group.id).await {
            Ok(members) => group.members = members,
            Err(e) => warn!("[HTTP] Could not list members of group {}: {}", group.id, e),
        }
    }

    Ok(groups)
}

/// `GET /groups`
pub async fn list_groups(State(state): State<AppState>) -> std::result::Result<Json<Vec<Group>>, ApiError> {
    info!("[HTTP] GET /groups");
    Ok(Json(groups_with_members(&state.stores).await?))
}

/// `GET /groupOn?group=<id>`
pub async fn group_on(
    State(state): State<AppState>,
    Query(query): Query<GroupQuery>,
) -> std::result::Result<Response, ApiError> {
    info!("[HTTP] GET /groupOn group={:?}", query.group);
    switch(&state, query, GroupCommand::ON).await
}

/// `GET /groupOff?group=<id>`
pub async fn group_off(
    State(state): State<AppState>,
    Query(query): Query<GroupQuery>,
) -> std::result::Result<Response, ApiError> {
    info!("[HTTP] GET /groupOff group={:?}", query.group);
    switch(&state, query, GroupCommand::OFF).await
}

async fn switch(
    state: &AppState,
    query: GroupQuery,
    command: GroupCommand,
) -> std::result::Result<Response, ApiError> {
    let id: i64 = query
        .group
        .as_deref()
        .and_then(|id| id.trim().parse().ok())
        .ok_or(ApiError::BadRequest("Invalid group id"))?;

    let group = state
        .stores
        .groups
        .get_group(id)
        .await
        .map_err(|e| ApiError::lookup(e, "Group not found"))?;

    state.commands.send(&group, command).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, "/")]).into_response())
}
