//! Expense endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use prosocial_common::db::expenses::{self, ExpensePayload, EXPENSE_STATUSES};
use prosocial_common::db::models::Expense;
use prosocial_common::db::studios;
use prosocial_common::validate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExpenseListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
}

/// GET /api/studios/:studio_id/expenses?status=
pub async fn list_expenses(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<ExpenseListResponse>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            validate::one_of(raw, EXPENSE_STATUSES)
                .map_err(|msg| ApiError::BadRequest(format!("status {}", msg)))?,
        ),
    };

    studios::get_studio(&state.db, &studio_id).await?;

    let expenses = expenses::list_expenses(&state.db, &studio_id, status.as_deref()).await?;
    Ok(Json(ExpenseListResponse { expenses }))
}

/// POST /api/studios/:studio_id/expenses
pub async fn create_expense(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    Json(payload): Json<ExpensePayload>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    studios::get_studio(&state.db, &studio_id).await?;

    let new = payload.validate()?;
    let expense = expenses::create_expense(&state.db, &studio_id, &new).await?;

    info!("Created expense '{}' for studio {}", expense.description, studio_id);
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /api/studios/:studio_id/expenses/:expense_id
pub async fn get_expense(
    State(state): State<AppState>,
    Path((studio_id, expense_id)): Path<(String, String)>,
) -> Result<Json<Expense>, ApiError> {
    let expense = expenses::get_expense(&state.db, &studio_id, &expense_id).await?;
    Ok(Json(expense))
}

/// PUT /api/studios/:studio_id/expenses/:expense_id
pub async fn update_expense(
    State(state): State<AppState>,
    Path((studio_id, expense_id)): Path<(String, String)>,
    Json(payload): Json<ExpensePayload>,
) -> Result<Json<Expense>, ApiError> {
    let new = payload.validate()?;
    let expense = expenses::update_expense(&state.db, &studio_id, &expense_id, &new).await?;
    Ok(Json(expense))
}

/// POST /api/studios/:studio_id/expenses/:expense_id/pay
///
/// Marks the expense paid and stamps the payment time.
pub async fn pay_expense(
    State(state): State<AppState>,
    Path((studio_id, expense_id)): Path<(String, String)>,
) -> Result<Json<Expense>, ApiError> {
    let expense = expenses::mark_paid(&state.db, &studio_id, &expense_id).await?;

    info!("Marked expense {} paid for studio {}", expense_id, studio_id);
    Ok(Json(expense))
}

/// DELETE /api/studios/:studio_id/expenses/:expense_id
pub async fn delete_expense(
    State(state): State<AppState>,
    Path((studio_id, expense_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    expenses::delete_expense(&state.db, &studio_id, &expense_id).await?;

    info!("Deleted expense {} from studio {}", expense_id, studio_id);
    Ok(StatusCode::NO_CONTENT)
}
