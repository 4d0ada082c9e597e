//! Pipeline stage endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use prosocial_common::db::models::PipelineStage;
use prosocial_common::db::stages::{self, StagePayload, StagePosition, PIPELINE_TYPES};
use prosocial_common::db::studios;
use prosocial_common::validate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ApiError;
use crate::AppState;

/// Query parameters selecting a pipeline
#[derive(Debug, Deserialize)]
pub struct PipelineQuery {
    pub pipeline_type: Option<String>,
}

impl PipelineQuery {
    fn pipeline_type(&self) -> Result<String, ApiError> {
        validate::one_of(self.pipeline_type.as_deref().unwrap_or("lead"), PIPELINE_TYPES)
            .map_err(|msg| ApiError::BadRequest(format!("pipeline_type {}", msg)))
    }
}

#[derive(Debug, Serialize)]
pub struct StageListResponse {
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub stages: Vec<StagePosition>,
    pub pipeline_type: Option<String>,
}

/// GET /api/studios/:studio_id/stages?pipeline_type=
///
/// Active stages ordered by position.
pub async fn list_stages(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Query(query): Query<PipelineQuery>,
) -> Result<Json<StageListResponse>, ApiError> {
    let pipeline_type = query.pipeline_type()?;
    studios::get_studio(&state.db, &studio_id).await?;

    let stages = stages::list_stages(&state.db, &studio_id, &pipeline_type).await?;
    Ok(Json(StageListResponse { stages }))
}

/// POST /api/studios/:studio_id/stages
///
/// Appends the stage at the end of its pipeline.
pub async fn create_stage(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(payload): Json<StagePayload>,
) -> Result<(StatusCode, Json<PipelineStage>), ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let new = payload.validate()?;
    let stage = stages::create_stage(&state.db, &studio_id, &new).await?;

    info!("Created stage '{}' for studio {}", stage.name, studio_id);
    Ok((StatusCode::CREATED, Json(stage)))
}

/// PUT /api/studios/:studio_id/stages/:stage_id
pub async fn update_stage(
    State(state): State<AppState>,
    Path((studio_id, stage_id)): Path<(String, String)>,
    Json(payload): Json<StagePayload>,
) -> Result<Json<PipelineStage>, ApiError> {
    let new = payload.validate()?;
    let stage = stages::update_stage(&state.db, &studio_id, &stage_id, &new).await?;
    Ok(Json(stage))
}

/// DELETE /api/studios/:studio_id/stages/:stage_id
///
/// Refused with 409 while leads still reference the stage.
pub async fn delete_stage(
    State(state): State<AppState>,
    Path((studio_id, stage_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    stages::delete_stage(&state.db, &studio_id, &stage_id).await?;

    info!("Deleted stage {} from studio {}", stage_id, studio_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/studios/:studio_id/stages/reorder
///
/// Accepts the complete `(stage_id, position)` set for one pipeline and
/// applies it in a single transaction. The submission must be a permutation
/// of the pipeline's active stages.
pub async fn reorder_stages(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<StageListResponse>, ApiError> {
    let pipeline_type =
        validate::one_of(request.pipeline_type.as_deref().unwrap_or("lead"), PIPELINE_TYPES)
            .map_err(|msg| ApiError::BadRequest(format!("pipeline_type {}", msg)))?;

    studios::get_studio(&state.db, &studio_id).await?;

    let stages =
        stages::reorder_stages(&state.db, &studio_id, &pipeline_type, &request.stages).await?;

    info!(
        "Reordered {} stages of {} pipeline for studio {}",
        stages.len(),
        pipeline_type,
        studio_id
    );
    Ok(Json(StageListResponse { stages }))
}
