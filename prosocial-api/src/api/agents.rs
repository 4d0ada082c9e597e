//! Sales agent endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use prosocial_common::db::agents::{self, AgentPayload};
use prosocial_common::db::models::Agent;
use prosocial_common::db::studios;
use serde::Serialize;
use tracing::info;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
}

/// GET /api/studios/:studio_id/agents
pub async fn list_agents(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
) -> Result<Json<AgentListResponse>, ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let agents = agents::list_agents(&state.db, &studio_id).await?;
    Ok(Json(AgentListResponse { agents }))
}

/// POST /api/studios/:studio_id/agents
pub async fn create_agent(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(payload): Json<AgentPayload>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let new = payload.validate()?;
    let agent = agents::create_agent(&state.db, &studio_id, &new).await?;

    info!("Created agent '{}' for studio {}", agent.name, studio_id);
    Ok((StatusCode::CREATED, Json(agent)))
}

/// GET /api/studios/:studio_id/agents/:agent_id
pub async fn get_agent(
    State(state): State<AppState>,
    Path((studio_id, agent_id)): Path<(String, String)>,
) -> Result<Json<Agent>, ApiError> {
    let agent = agents::get_agent(&state.db, &studio_id, &agent_id).await?;
    Ok(Json(agent))
}

/// PUT /api/studios/:studio_id/agents/:agent_id
pub async fn update_agent(
    State(state): State<AppState>,
    Path((studio_id, agent_id)): Path<(String, String)>,
    Json(payload): Json<AgentPayload>,
) -> Result<Json<Agent>, ApiError> {
    let new = payload.validate()?;
    let agent = agents::update_agent(&state.db, &studio_id, &agent_id, &new).await?;
    Ok(Json(agent))
}

/// DELETE /api/studios/:studio_id/agents/:agent_id
pub async fn delete_agent(
    State(state): State<AppState>,
    Path((studio_id, agent_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    agents::delete_agent(&state.db, &studio_id, &agent_id).await?;

    info!("Deleted agent {} from studio {}", agent_id, studio_id);
    Ok(StatusCode::NO_CONTENT)
}
