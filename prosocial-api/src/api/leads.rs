//! Lead endpoints
//!
//! Lead creation fires the studio notification email without awaiting
//! delivery; the request outcome never depends on the relay.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use prosocial_common::db::leads::{self, BoardColumn, LeadPayload};
use prosocial_common::db::models::Lead;
use prosocial_common::db::studios;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::ApiError;
use crate::AppState;

/// Optional lead list filters
#[derive(Debug, Deserialize)]
pub struct LeadListQuery {
    pub stage_id: Option<String>,
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PipelineQuery {
    pub pipeline_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub columns: Vec<BoardColumn>,
}

#[derive(Debug, Deserialize)]
pub struct MoveLeadRequest {
    pub stage_id: String,
}

/// GET /api/studios/:studio_id/leads?stage_id=&agent_id=
pub async fn list_leads(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<LeadListResponse>, ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let leads = leads::list_leads(
        &state.db,
        &studio_id,
        query.stage_id.as_deref(),
        query.agent_id.as_deref(),
    )
    .await?;

    Ok(Json(LeadListResponse { leads }))
}

/// GET /api/studios/:studio_id/leads/board?pipeline_type=
///
/// Kanban shape: active stages in display order, each with its leads.
pub async fn get_board(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Query(query): Query<PipelineQuery>,
) -> Result<Json<BoardResponse>, ApiError> {
    let pipeline_type = query.pipeline_type.as_deref().unwrap_or("lead");
    studios::get_studio(&state.db, &studio_id).await?;

    let columns = leads::board(&state.db, &studio_id, pipeline_type).await?;
    Ok(Json(BoardResponse { columns }))
}

/// POST /api/studios/:studio_id/leads
///
/// A repeated submission with the same `request_key` returns the existing
/// lead with 200 instead of creating a second row.
pub async fn create_lead(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(payload): Json<LeadPayload>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let studio = studios::get_studio(&state.db, &studio_id).await?;

    let new = payload.validate()?;
    let created = leads::create_lead(&state.db, &studio_id, &new).await?;

    if created.created {
        info!("Created lead '{}' for studio {}", created.lead.name, studio_id);

        if let Some(studio_email) = &studio.email {
            state.email.send_template(
                "lead_created",
                studio_email,
                json!({
                    "studio": studio.name,
                    "lead_name": created.lead.name,
                    "lead_email": created.lead.email,
                    "lead_phone": created.lead.phone,
                }),
            );
        }

        Ok((StatusCode::CREATED, Json(created.lead)))
    } else {
        info!(
            "Duplicate lead submission resolved to existing lead {} for studio {}",
            created.lead.guid, studio_id
        );
        Ok((StatusCode::OK, Json(created.lead)))
    }
}

/// GET /api/studios/:studio_id/leads/:lead_id
pub async fn get_lead(
    State(state): State<AppState>,
    Path((studio_id, lead_id)): Path<(String, String)>,
) -> Result<Json<Lead>, ApiError> {
    let lead = leads::get_lead(&state.db, &studio_id, &lead_id).await?;
    Ok(Json(lead))
}

/// PUT /api/studios/:studio_id/leads/:lead_id
pub async fn update_lead(
    State(state): State<AppState>,
    Path((studio_id, lead_id)): Path<(String, String)>,
    Json(payload): Json<LeadPayload>,
) -> Result<Json<Lead>, ApiError> {
    let new = payload.validate()?;
    let lead = leads::update_lead(&state.db, &studio_id, &lead_id, &new).await?;
    Ok(Json(lead))
}

/// POST /api/studios/:studio_id/leads/:lead_id/stage
///
/// Moves the lead to another active stage of the same studio. Only the
/// addressed lead changes.
pub async fn move_lead(
    State(state): State<AppState>,
    Path((studio_id, lead_id)): Path<(String, String)>,
    Json(request): Json<MoveLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let lead = leads::move_lead_stage(&state.db, &studio_id, &lead_id, &request.stage_id).await?;

    info!("Moved lead {} to stage {}", lead_id, request.stage_id);
    Ok(Json(lead))
}

/// DELETE /api/studios/:studio_id/leads/:lead_id
pub async fn delete_lead(
    State(state): State<AppState>,
    Path((studio_id, lead_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    leads::delete_lead(&state.db, &studio_id, &lead_id).await?;

    info!("Deleted lead {} from studio {}", lead_id, studio_id);
    Ok(StatusCode::NO_CONTENT)
}
