//! Billing endpoints: plans and studio subscriptions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use prosocial_common::db::billing::{
    self, AssignedSubscription, PlanPayload, SubscriptionDetail,
};
use prosocial_common::db::models::Plan;
use prosocial_common::db::studios;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PlanListResponse {
    pub plans: Vec<Plan>,
}

#[derive(Debug, Deserialize)]
pub struct AssignPlanRequest {
    pub plan_id: String,
}

// ========================================
// Plans (admin)
// ========================================

/// GET /api/plans
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<PlanListResponse>, ApiError> {
    let plans = billing::list_plans(&state.db).await?;
    Ok(Json(PlanListResponse { plans }))
}

/// POST /api/plans
pub async fn create_plan(
    State(state): State<AppState>,
    Json(payload): Json<PlanPayload>,
) -> Result<(StatusCode, Json<Plan>), ApiError> {
    let new = payload.validate()?;
    let plan = billing::create_plan(&state.db, &new).await?;

    info!("Created plan '{}'", plan.name);
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PUT /api/plans/:plan_id
pub async fn update_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
    Json(payload): Json<PlanPayload>,
) -> Result<Json<Plan>, ApiError> {
    let new = payload.validate()?;
    let plan = billing::update_plan(&state.db, &plan_id, &new).await?;
    Ok(Json(plan))
}

/// DELETE /api/plans/:plan_id
///
/// Plans referenced by subscriptions are deactivated instead of deleted.
pub async fn delete_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    billing::delete_plan(&state.db, &plan_id).await?;

    info!("Deleted plan {}", plan_id);
    Ok(StatusCode::NO_CONTENT)
}

// ========================================
// Studio subscription
// ========================================

/// GET /api/studios/:studio_id/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
) -> Result<Json<SubscriptionDetail>, ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let detail = billing::get_current_subscription(&state.db, &studio_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Studio has no live subscription: {}", studio_id))
        })?;

    Ok(Json(detail))
}

/// PUT /api/studios/:studio_id/subscription
///
/// Assigns a plan: cancels the current subscription, creates a trialing one
/// and the pending payment handed to the payment processor.
pub async fn assign_subscription(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(request): Json<AssignPlanRequest>,
) -> Result<Json<AssignedSubscription>, ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let assigned = billing::assign_subscription(&state.db, &studio_id, &request.plan_id).await?;

    info!(
        "Assigned plan '{}' to studio {} (payment ref {})",
        assigned.plan.name, studio_id, assigned.payment.external_ref
    );
    Ok(Json(assigned))
}

/// DELETE /api/studios/:studio_id/subscription
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    billing::cancel_subscription(&state.db, &studio_id).await?;

    info!("Canceled subscription for studio {}", studio_id);
    Ok(StatusCode::NO_CONTENT)
}
