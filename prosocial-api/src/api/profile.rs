//! Public studio profile endpoint
//!
//! The client-facing page data: studio identity plus the visible parts of
//! its catalog. No authentication.

use axum::{
    extract::{Path, State},
    Json,
};
use prosocial_common::db::catalog::{self, PackageDetail};
use prosocial_common::db::models::Service;
use prosocial_common::db::studios;
use serde::Serialize;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub name: String,
    pub slug: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub packages: Vec<PackageDetail>,
    pub services: Vec<Service>,
}

/// GET /api/profile/:slug
///
/// 404 for unknown or deactivated studios.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let studio = studios::get_studio_by_slug(&state.db, &slug).await?;

    let packages = catalog::list_visible_packages(&state.db, &studio.guid).await?;
    let services = catalog::list_visible_services(&state.db, &studio.guid).await?;

    Ok(Json(ProfileResponse {
        name: studio.name,
        slug: studio.slug,
        email: studio.email,
        phone: studio.phone,
        packages,
        services,
    }))
}
