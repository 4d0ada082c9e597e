//! Lookup endpoints: acquisition channels and advertising platforms

use axum::{extract::State, Json};
use prosocial_common::db::lookups;
use prosocial_common::db::models::{AcquisitionChannel, AdvertisingPlatform};
use serde::Serialize;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    pub channels: Vec<AcquisitionChannel>,
}

#[derive(Debug, Serialize)]
pub struct PlatformListResponse {
    pub platforms: Vec<AdvertisingPlatform>,
}

/// GET /api/channels - Active acquisition channels, alphabetical
pub async fn list_channels(
    State(state): State<AppState>,
) -> Result<Json<ChannelListResponse>, ApiError> {
    let channels = lookups::list_acquisition_channels(&state.db).await?;
    Ok(Json(ChannelListResponse { channels }))
}

/// GET /api/platforms - Active advertising platforms, alphabetical
pub async fn list_platforms(
    State(state): State<AppState>,
) -> Result<Json<PlatformListResponse>, ApiError> {
    let platforms = lookups::list_advertising_platforms(&state.db).await?;
    Ok(Json(PlatformListResponse { platforms }))
}
