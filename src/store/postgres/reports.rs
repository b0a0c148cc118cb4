use async_trait::async_trait;

use super::PostgresStore;
use crate::error::Result;
use crate::model::{NewReport, Reading, Report, ReportKind, ReportRange};
use crate::store::ReportStore;

fn select_columns(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Illuminance => "device_id, area_id, date, value, value_lux",
        _ => "device_id, area_id, date, value, NULL::DOUBLE PRECISION AS value_lux",
    }
}

#[async_trait]
impl ReportStore for PostgresStore {
    async fn create_report(&self, report: &NewReport) -> Result<Report> {
        let kind = report.reading.kind();
        let table = kind.table();
        let columns = select_columns(kind);

        let query = match report.reading {
            Reading::Illuminance { .. } => format!(
                "INSERT INTO {table} (device_id, area_id, date, value, value_lux) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {columns}"
            ),
            _ => format!(
                "INSERT INTO {table} (device_id, area_id, date, value) \
                 VALUES ($1, $2, $3, $4) RETURNING {columns}"
            ),
        };

        let mut insert = sqlx::query_as::<_, Report>(&query)
            .bind(&report.device_address)
            .bind(report.area_id)
            .bind(report.date)
            .bind(report.reading.value());
        if let Some(lux) = report.reading.value_lux() {
            insert = insert.bind(lux);
        }

        Ok(insert.fetch_one(&self.pool).await?)
    }

    async fn list_reports(
        &self,
        kind: ReportKind,
        area_id: i64,
        range: ReportRange,
    ) -> Result<Vec<Report>> {
        let query = format!(
            "SELECT {columns} FROM {table} \
             WHERE area_id = $1 \
               AND ($2::TIMESTAMPTZ IS NULL OR date >= $2) \
               AND ($3::TIMESTAMPTZ IS NULL OR date <= $3) \
             ORDER BY date ASC",
            columns = select_columns(kind),
            table = kind.table(),
        );

        let reports = sqlx::query_as::<_, Report>(&query)
            .bind(area_id)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;

        Ok(reports)
    }
}
