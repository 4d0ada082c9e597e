//! Billing queries: plans, subscriptions and payments
//!
//! A studio holds at most one live (non-canceled) subscription. Payments
//! carry an `external_ref` that the payment processor echoes back in
//! webhook events; completion activates the subscription.

use crate::db::models::{Payment, Plan, Subscription};
use crate::validate::{self, FieldErrors, ValidationResult};
use crate::{Error, Result};
use chrono::{Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

pub const BILLING_INTERVALS: &[&str] = &["monthly", "yearly"];

// ========================================
// Plans
// ========================================

/// Create/update payload for a plan
#[derive(Debug, Clone, Deserialize)]
pub struct PlanPayload {
    pub name: String,
    /// Price as submitted, e.g. `"199.90"`
    pub price: String,
    pub billing_interval: Option<String>,
    pub lead_quota: Option<i64>,
    pub active: Option<bool>,
}

/// Validated plan fields
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub name: String,
    pub price_cents: i64,
    pub billing_interval: String,
    pub lead_quota: i64,
    pub active: bool,
}

impl PlanPayload {
    pub fn validate(&self) -> ValidationResult<NewPlan> {
        let mut errors = FieldErrors::new();

        let name = errors.capture("name", validate::required_text(&self.name, 80));
        let price_cents = errors.capture("price", validate::money_cents(&self.price));
        let billing_interval = errors.capture(
            "billing_interval",
            validate::one_of(
                self.billing_interval.as_deref().unwrap_or("monthly"),
                BILLING_INTERVALS,
            ),
        );
        let lead_quota = errors.capture(
            "lead_quota",
            validate::int_in_range(self.lead_quota.unwrap_or(0), 0, 1_000_000),
        );

        let (name, price_cents, billing_interval, lead_quota) =
            match (name, price_cents, billing_interval, lead_quota) {
                (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
                _ => return Err(errors),
            };

        errors.into_result(NewPlan {
            name,
            price_cents,
            billing_interval,
            lead_quota,
            active: self.active.unwrap_or(true),
        })
    }
}

pub async fn list_plans(pool: &SqlitePool) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans WHERE active = 1 ORDER BY price_cents ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(plans)
}

pub async fn get_plan(pool: &SqlitePool, plan_id: &str) -> Result<Plan> {
    sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE guid = ?")
        .bind(plan_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Plan not found: {}", plan_id)))
}

pub async fn create_plan(pool: &SqlitePool, new: &NewPlan) -> Result<Plan> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM plans WHERE name = ?)")
        .bind(&new.name)
        .fetch_one(pool)
        .await?;
    if taken {
        return Err(Error::Conflict(format!("Plan name already in use: {}", new.name)));
    }

    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO plans (guid, name, price_cents, billing_interval, lead_quota, active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&new.name)
    .bind(new.price_cents)
    .bind(&new.billing_interval)
    .bind(new.lead_quota)
    .bind(new.active)
    .execute(pool)
    .await?;

    get_plan(pool, &guid).await
}

pub async fn update_plan(pool: &SqlitePool, plan_id: &str, new: &NewPlan) -> Result<Plan> {
    let taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM plans WHERE name = ? AND guid != ?)")
            .bind(&new.name)
            .bind(plan_id)
            .fetch_one(pool)
            .await?;
    if taken {
        return Err(Error::Conflict(format!("Plan name already in use: {}", new.name)));
    }

    let result = sqlx::query(
        r#"
        UPDATE plans
        SET name = ?, price_cents = ?, billing_interval = ?, lead_quota = ?, active = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&new.name)
    .bind(new.price_cents)
    .bind(&new.billing_interval)
    .bind(new.lead_quota)
    .bind(new.active)
    .bind(plan_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Plan not found: {}", plan_id)));
    }

    get_plan(pool, plan_id).await
}

/// Delete a plan, or deactivate it when subscriptions reference it so
/// historical subscriptions keep their plan row
pub async fn delete_plan(pool: &SqlitePool, plan_id: &str) -> Result<()> {
    let referenced: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE plan_id = ?")
            .bind(plan_id)
            .fetch_one(pool)
            .await?;

    if referenced > 0 {
        let result = sqlx::query(
            "UPDATE plans SET active = 0, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
        )
        .bind(plan_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Plan not found: {}", plan_id)));
        }
        return Ok(());
    }

    let result = sqlx::query("DELETE FROM plans WHERE guid = ?")
        .bind(plan_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Plan not found: {}", plan_id)));
    }

    Ok(())
}

// ========================================
// Subscriptions
// ========================================

/// Subscription joined with its plan
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetail {
    pub subscription: Subscription,
    pub plan: Plan,
}

/// Result of assigning a plan: the new subscription and its pending payment
#[derive(Debug, Clone, Serialize)]
pub struct AssignedSubscription {
    pub subscription: Subscription,
    pub plan: Plan,
    pub payment: Payment,
}

/// The studio's live subscription, if any
pub async fn get_current_subscription(
    pool: &SqlitePool,
    studio_id: &str,
) -> Result<Option<SubscriptionDetail>> {
    let subscription = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT * FROM subscriptions
        WHERE studio_id = ? AND status != 'canceled'
        ORDER BY created_at DESC, guid DESC
        LIMIT 1
        "#,
    )
    .bind(studio_id)
    .fetch_optional(pool)
    .await?;

    match subscription {
        Some(subscription) => {
            let plan = get_plan(pool, &subscription.plan_id).await?;
            Ok(Some(SubscriptionDetail { subscription, plan }))
        }
        None => Ok(None),
    }
}

/// Assign a plan to a studio
///
/// Cancels any live subscription, creates a trialing one and a pending
/// payment for the first charge, all in one transaction. The payment's
/// `external_ref` is the correlation id handed to the payment processor.
pub async fn assign_subscription(
    pool: &SqlitePool,
    studio_id: &str,
    plan_id: &str,
) -> Result<AssignedSubscription> {
    let plan = get_plan(pool, plan_id).await?;
    if !plan.active {
        return Err(Error::InvalidInput(format!("Plan is not active: {}", plan_id)));
    }

    let subscription_id = Uuid::new_v4().to_string();
    let payment_id = Uuid::new_v4().to_string();
    let external_ref = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE subscriptions
        SET status = 'canceled', updated_at = CURRENT_TIMESTAMP
        WHERE studio_id = ? AND status != 'canceled'
        "#,
    )
    .bind(studio_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO subscriptions (guid, studio_id, plan_id, status)
        VALUES (?, ?, ?, 'trialing')
        "#,
    )
    .bind(&subscription_id)
    .bind(studio_id)
    .bind(plan_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO payments (guid, subscription_id, external_ref, amount_cents, status)
        VALUES (?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(&payment_id)
    .bind(&subscription_id)
    .bind(&external_ref)
    .bind(plan.price_cents)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let subscription = get_subscription(pool, &subscription_id).await?;
    let payment = get_payment_by_ref(pool, &external_ref).await?;

    Ok(AssignedSubscription {
        subscription,
        plan,
        payment,
    })
}

/// Cancel the studio's live subscription
pub async fn cancel_subscription(pool: &SqlitePool, studio_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET status = 'canceled', updated_at = CURRENT_TIMESTAMP
        WHERE studio_id = ? AND status != 'canceled'
        "#,
    )
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Studio has no live subscription: {}",
            studio_id
        )));
    }

    Ok(())
}

async fn get_subscription(pool: &SqlitePool, subscription_id: &str) -> Result<Subscription> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE guid = ?")
        .bind(subscription_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Subscription not found: {}", subscription_id)))
}

// ========================================
// Payments
// ========================================

pub async fn get_payment_by_ref(pool: &SqlitePool, external_ref: &str) -> Result<Payment> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE external_ref = ?")
        .bind(external_ref)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Payment not found: {}", external_ref)))
}

/// Apply a `payment.completed` processor event
///
/// Marks the payment completed and activates its subscription with a fresh
/// period end. Repeated delivery of the same event is a no-op.
pub async fn complete_payment(pool: &SqlitePool, external_ref: &str) -> Result<Payment> {
    let payment = get_payment_by_ref(pool, external_ref).await?;
    if payment.status == "completed" {
        return Ok(payment);
    }

    let subscription = get_subscription(pool, &payment.subscription_id).await?;
    let plan = get_plan(pool, &subscription.plan_id).await?;

    let months = if plan.billing_interval == "yearly" { 12 } else { 1 };
    let period_end = Utc::now()
        .naive_utc()
        .checked_add_months(Months::new(months))
        .ok_or_else(|| Error::Internal("Period end out of range".to_string()))?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE payments
        SET status = 'completed', paid_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE external_ref = ?
        "#,
    )
    .bind(external_ref)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE subscriptions
        SET status = 'active', current_period_end = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(period_end)
    .bind(&payment.subscription_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_payment_by_ref(pool, external_ref).await
}

/// Apply a `payment.failed` processor event
///
/// Marks the payment failed and the subscription past due.
pub async fn fail_payment(pool: &SqlitePool, external_ref: &str) -> Result<Payment> {
    let payment = get_payment_by_ref(pool, external_ref).await?;
    if payment.status == "completed" {
        // Completed payments stay completed; a late failure event is stale
        return Ok(payment);
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE payments
        SET status = 'failed', updated_at = CURRENT_TIMESTAMP
        WHERE external_ref = ?
        "#,
    )
    .bind(external_ref)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE subscriptions
        SET status = 'past_due', updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND status != 'canceled'
        "#,
    )
    .bind(&payment.subscription_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_payment_by_ref(pool, external_ref).await
}
