use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use crate::model::{Report, ReportKind, ReportRange};

#[derive(Debug, Default, Deserialize)]
pub struct ReportsQuery {
    pub area: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn parse_date(value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|_| ApiError::BadRequest("Invalid date"))
        })
        .transpose()
}

/// `GET /reports?area=<uuid>&type=<kind>[&from=<rfc3339>&to=<rfc3339>]`
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
) -> Result<Json<Vec<Report>>, ApiError> {
    info!(
        "[HTTP] GET /reports area={:?} type={:?}",
        query.area, query.kind
    );

    let uuid = query
        .area
        .as_deref()
        .and_then(|area| Uuid::parse_str(area).ok())
        .ok_or(ApiError::NotFound("Area not found"))?;
    let area = state
        .stores
        .areas
        .get_area(uuid)
        .await
        .map_err(|e| ApiError::lookup(e, "Area not found"))?;

    let kind = query
        .kind
        .as_deref()
        .and_then(|kind| ReportKind::from_str(kind).ok())
        .ok_or(ApiError::BadRequest("Invalid report type"))?;

    let range = ReportRange {
        from: parse_date(query.from.as_deref())?,
        to: parse_date(query.to.as_deref())?,
    };

    let reports = state.stores.reports.list_reports(kind, area.id, range).await?;
    Ok(Json(reports))
}
