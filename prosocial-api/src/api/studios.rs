//! Studio (tenant) administration endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use prosocial_common::db::models::Studio;
use prosocial_common::db::studios::{self, StudioPayload};
use serde::Serialize;
use tracing::info;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StudioListResponse {
    pub studios: Vec<Studio>,
}

/// GET /api/studios
pub async fn list_studios(
    State(state): State<AppState>,
) -> Result<Json<StudioListResponse>, ApiError> {
    let studios = studios::list_studios(&state.db).await?;
    Ok(Json(StudioListResponse { studios }))
}

/// POST /api/studios
///
/// Creates the tenant and seeds its default lead pipeline.
pub async fn create_studio(
    State(state): State<AppState>,
    Json(payload): Json<StudioPayload>,
) -> Result<(StatusCode, Json<Studio>), ApiError> {
    let new = payload.validate()?;
    let studio = studios::create_studio(&state.db, &new).await?;

    info!("Created studio '{}' ({})", studio.name, studio.guid);
    Ok((StatusCode::CREATED, Json(studio)))
}

/// GET /api/studios/:studio_id
pub async fn get_studio(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
) -> Result<Json<Studio>, ApiError> {
    let studio = studios::get_studio(&state.db, &studio_id).await?;
    Ok(Json(studio))
}

/// PUT /api/studios/:studio_id
pub async fn update_studio(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(payload): Json<StudioPayload>,
) -> Result<Json<Studio>, ApiError> {
    let new = payload.validate()?;
    let studio = studios::update_studio(&state.db, &studio_id, &new).await?;
    Ok(Json(studio))
}

/// DELETE /api/studios/:studio_id
pub async fn delete_studio(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    studios::delete_studio(&state.db, &studio_id).await?;

    info!("Deleted studio {}", studio_id);
    Ok(StatusCode::NO_CONTENT)
}
