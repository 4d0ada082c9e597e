//! Catalog endpoints: services and packages
//!
//! Prices arrive as strings and are coerced by the validation layer before
//! persistence; malformed or negative input never reaches the database.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use prosocial_common::db::catalog::{self, PackageDetail, PackagePayload, ServicePayload};
use prosocial_common::db::models::Service;
use prosocial_common::db::studios;
use serde::Serialize;
use tracing::info;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceListResponse {
    pub services: Vec<Service>,
}

#[derive(Debug, Serialize)]
pub struct PackageListResponse {
    pub packages: Vec<PackageDetail>,
}

// ========================================
// Services
// ========================================

/// GET /api/studios/:studio_id/services
pub async fn list_services(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
) -> Result<Json<ServiceListResponse>, ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let services = catalog::list_services(&state.db, &studio_id).await?;
    Ok(Json(ServiceListResponse { services }))
}

/// POST /api/studios/:studio_id/services
pub async fn create_service(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(payload): Json<ServicePayload>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let new = payload.validate()?;
    let service = catalog::create_service(&state.db, &studio_id, &new).await?;

    info!("Created service '{}' for studio {}", service.name, studio_id);
    Ok((StatusCode::CREATED, Json(service)))
}

/// GET /api/studios/:studio_id/services/:service_id
pub async fn get_service(
    State(state): State<AppState>,
    Path((studio_id, service_id)): Path<(String, String)>,
) -> Result<Json<Service>, ApiError> {
    let service = catalog::get_service(&state.db, &studio_id, &service_id).await?;
    Ok(Json(service))
}

/// PUT /api/studios/:studio_id/services/:service_id
pub async fn update_service(
    State(state): State<AppState>,
    Path((studio_id, service_id)): Path<(String, String)>,
    Json(payload): Json<ServicePayload>,
) -> Result<Json<Service>, ApiError> {
    let new = payload.validate()?;
    let service = catalog::update_service(&state.db, &studio_id, &service_id, &new).await?;
    Ok(Json(service))
}

/// DELETE /api/studios/:studio_id/services/:service_id
///
/// Refused with 409 while a package references the service.
pub async fn delete_service(
    State(state): State<AppState>,
    Path((studio_id, service_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_service(&state.db, &studio_id, &service_id).await?;

    info!("Deleted service {} from studio {}", service_id, studio_id);
    Ok(StatusCode::NO_CONTENT)
}

// ========================================
// Packages
// ========================================

/// GET /api/studios/:studio_id/packages
pub async fn list_packages(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
) -> Result<Json<PackageListResponse>, ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let packages = catalog::list_packages(&state.db, &studio_id).await?;
    Ok(Json(PackageListResponse { packages }))
}

/// POST /api/studios/:studio_id/packages
///
/// Every referenced service must belong to the same studio.
pub async fn create_package(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(payload): Json<PackagePayload>,
) -> Result<(StatusCode, Json<PackageDetail>), ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let new = payload.validate()?;
    let package = catalog::create_package(&state.db, &studio_id, &new).await?;

    info!("Created package '{}' for studio {}", package.package.name, studio_id);
    Ok((StatusCode::CREATED, Json(package)))
}

/// GET /api/studios/:studio_id/packages/:package_id
pub async fn get_package(
    State(state): State<AppState>,
    Path((studio_id, package_id)): Path<(String, String)>,
) -> Result<Json<PackageDetail>, ApiError> {
    let package = catalog::get_package(&state.db, &studio_id, &package_id).await?;
    Ok(Json(package))
}

/// PUT /api/studios/:studio_id/packages/:package_id
pub async fn update_package(
    State(state): State<AppState>,
    Path((studio_id, package_id)): Path<(String, String)>,
    Json(payload): Json<PackagePayload>,
) -> Result<Json<PackageDetail>, ApiError> {
    let new = payload.validate()?;
    let package = catalog::update_package(&state.db, &studio_id, &package_id, &new).await?;
    Ok(Json(package))
}

/// DELETE /api/studios/:studio_id/packages/:package_id
pub async fn delete_package(
    State(state): State<AppState>,
    Path((studio_id, package_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_package(&state.db, &studio_id, &package_id).await?;

    info!("Deleted package {} from studio {}", package_id, studio_id);
    Ok(StatusCode::NO_CONTENT)
}
