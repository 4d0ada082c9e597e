//! Reporting endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use prosocial_common::db::reports::{self, ExpenseReport, FunnelReport};
use prosocial_common::db::stages::PIPELINE_TYPES;
use prosocial_common::db::studios;
use prosocial_common::validate;
use serde::Deserialize;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExpenseReportQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct FunnelQuery {
    pub pipeline_type: Option<String>,
}

/// GET /api/studios/:studio_id/reports/expenses?year=
///
/// Defaults to the current year.
pub async fn expense_report(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Query(query): Query<ExpenseReportQuery>,
) -> Result<Json<ExpenseReport>, ApiError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    if !(2000..=2100).contains(&year) {
        return Err(ApiError::BadRequest(format!("Invalid year: {}", year)));
    }

    studios::get_studio(&state.db, &studio_id).await?;

    let report = reports::expense_summary(&state.db, &studio_id, year).await?;
    Ok(Json(report))
}

/// GET /api/studios/:studio_id/reports/funnel?pipeline_type=
pub async fn funnel_report(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Query(query): Query<FunnelQuery>,
) -> Result<Json<FunnelReport>, ApiError> {
    let pipeline_type =
        validate::one_of(query.pipeline_type.as_deref().unwrap_or("lead"), PIPELINE_TYPES)
            .map_err(|msg| ApiError::BadRequest(format!("pipeline_type {}", msg)))?;

    studios::get_studio(&state.db, &studio_id).await?;

    let report = reports::funnel(&state.db, &studio_id, &pipeline_type).await?;
    Ok(Json(report))
}
