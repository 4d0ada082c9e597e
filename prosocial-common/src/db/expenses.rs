//! Expense queries

use crate::db::models::Expense;
use crate::validate::{self, FieldErrors, ValidationResult};
use crate::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const EXPENSE_STATUSES: &[&str] = &["pending", "paid"];

/// Create/update payload for an expense
#[derive(Debug, Clone, Deserialize)]
pub struct ExpensePayload {
    pub description: String,
    pub category: Option<String>,
    /// Amount as submitted, e.g. `"350.00"`
    pub amount: String,
    /// Due date in `YYYY-MM-DD`
    pub due_date: Option<String>,
    pub status: Option<String>,
}

/// Validated expense fields
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub category: Option<String>,
    pub amount_cents: i64,
    pub due_date: Option<String>,
    pub status: String,
}

impl ExpensePayload {
    pub fn validate(&self) -> ValidationResult<NewExpense> {
        let mut errors = FieldErrors::new();

        let description =
            errors.capture("description", validate::required_text(&self.description, 200));
        let category =
            errors.capture("category", validate::optional_text(self.category.as_deref(), 60));
        let amount_cents = errors.capture("amount", validate::money_cents(&self.amount));
        let due_date = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => Some(None),
            Some(raw) => errors.capture("due_date", validate::iso_date(raw)).map(Some),
        };
        let status = errors.capture(
            "status",
            validate::one_of(self.status.as_deref().unwrap_or("pending"), EXPENSE_STATUSES),
        );

        let (description, category, amount_cents, due_date, status) =
            match (description, category, amount_cents, due_date, status) {
                (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
                _ => return Err(errors),
            };

        errors.into_result(NewExpense {
            description,
            category,
            amount_cents,
            due_date,
            status,
        })
    }
}

/// List expenses, optionally filtered by status
pub async fn list_expenses(
    pool: &SqlitePool,
    studio_id: &str,
    status: Option<&str>,
) -> Result<Vec<Expense>> {
    let expenses = sqlx::query_as::<_, Expense>(
        r#"
        SELECT * FROM expenses
        WHERE studio_id = ? AND (? IS NULL OR status = ?)
        ORDER BY COALESCE(due_date, date(created_at)) DESC, created_at DESC
        "#,
    )
    .bind(studio_id)
    .bind(status)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(expenses)
}

pub async fn get_expense(pool: &SqlitePool, studio_id: &str, expense_id: &str) -> Result<Expense> {
    sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE guid = ? AND studio_id = ?")
        .bind(expense_id)
        .bind(studio_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Expense not found: {}", expense_id)))
}

pub async fn create_expense(
    pool: &SqlitePool,
    studio_id: &str,
    new: &NewExpense,
) -> Result<Expense> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO expenses (guid, studio_id, description, category, amount_cents, due_date, status, paid_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CASE WHEN ? = 'paid' THEN CURRENT_TIMESTAMP END)
        "#,
    )
    .bind(&guid)
    .bind(studio_id)
    .bind(&new.description)
    .bind(&new.category)
    .bind(new.amount_cents)
    .bind(&new.due_date)
    .bind(&new.status)
    .bind(&new.status)
    .execute(pool)
    .await?;

    get_expense(pool, studio_id, &guid).await
}

pub async fn update_expense(
    pool: &SqlitePool,
    studio_id: &str,
    expense_id: &str,
    new: &NewExpense,
) -> Result<Expense> {
    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET description = ?, category = ?, amount_cents = ?, due_date = ?, status = ?,
            paid_at = CASE
                WHEN ? = 'paid' THEN COALESCE(paid_at, CURRENT_TIMESTAMP)
                ELSE NULL
            END,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(&new.description)
    .bind(&new.category)
    .bind(new.amount_cents)
    .bind(&new.due_date)
    .bind(&new.status)
    .bind(&new.status)
    .bind(expense_id)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Expense not found: {}", expense_id)));
    }

    get_expense(pool, studio_id, expense_id).await
}

/// Mark an expense paid and stamp the payment time
pub async fn mark_paid(pool: &SqlitePool, studio_id: &str, expense_id: &str) -> Result<Expense> {
    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET status = 'paid', paid_at = COALESCE(paid_at, CURRENT_TIMESTAMP),
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(expense_id)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Expense not found: {}", expense_id)));
    }

    get_expense(pool, studio_id, expense_id).await
}

pub async fn delete_expense(pool: &SqlitePool, studio_id: &str, expense_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM expenses WHERE guid = ? AND studio_id = ?")
        .bind(expense_id)
        .bind(studio_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Expense not found: {}", expense_id)));
    }

    Ok(())
}
