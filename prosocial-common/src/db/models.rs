//! Database models
//!
//! Row structs decoded straight from SQLite. Tenant-scoped rows carry
//! `studio_id`; money is integer cents; flags are SQLite INTEGER booleans.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub key: String,
    pub value: Option<String>,
}

/// Tenant account isolating its own leads, catalog and finances
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Studio {
    pub guid: String,
    pub name: String,
    pub slug: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Where a lead came from (Instagram, referral, ...)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AcquisitionChannel {
    pub guid: String,
    pub name: String,
    pub active: bool,
}

/// Paid advertising platform available for campaign attribution
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdvertisingPlatform {
    pub guid: String,
    pub name: String,
    pub active: bool,
}

/// Ordered phase of a studio pipeline
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PipelineStage {
    pub guid: String,
    pub studio_id: String,
    pub pipeline_type: String,
    pub name: String,
    pub color: String,
    pub position: i64,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Prospective client record; always references exactly one stage
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub guid: String,
    pub studio_id: String,
    pub stage_id: String,
    pub agent_id: Option<String>,
    pub channel_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub request_key: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Sales representative assigned to leads
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Agent {
    pub guid: String,
    pub studio_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub monthly_lead_goal: i64,
    pub commission_rate: f64,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Catalog item with price and visibility
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub guid: String,
    pub studio_id: String,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    pub visible: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Priced bundle of services sold to a client
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Package {
    pub guid: String,
    pub studio_id: String,
    pub name: String,
    pub event_type: Option<String>,
    pub price_cents: i64,
    pub visible: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Service line inside a package, joined with the service row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PackageServiceLine {
    pub service_id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Expense {
    pub guid: String,
    pub studio_id: String,
    pub description: String,
    pub category: Option<String>,
    pub amount_cents: i64,
    pub due_date: Option<String>,
    pub status: String,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Billing plan offered to studios
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub guid: String,
    pub name: String,
    pub price_cents: i64,
    pub billing_interval: String,
    pub lead_quota: i64,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub guid: String,
    pub studio_id: String,
    pub plan_id: String,
    pub status: String,
    pub current_period_end: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub guid: String,
    pub subscription_id: String,
    pub external_ref: String,
    pub amount_cents: i64,
    pub status: String,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
