//! Lead queries
//!
//! A lead always references exactly one pipeline stage; moving a lead
//! mutates that reference in place.

use crate::db::models::{Lead, PipelineStage};
use crate::validate::{self, FieldErrors, ValidationResult};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create/update payload for a lead
#[derive(Debug, Clone, Deserialize)]
pub struct LeadPayload {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub channel_id: Option<String>,
    pub agent_id: Option<String>,
    pub stage_id: Option<String>,
    pub notes: Option<String>,
    /// Optional idempotency key: a repeated submission with the same key
    /// returns the already-created lead instead of inserting again.
    pub request_key: Option<String>,
}

/// Validated lead fields
#[derive(Debug, Clone)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub channel_id: Option<String>,
    pub agent_id: Option<String>,
    pub stage_id: Option<String>,
    pub notes: Option<String>,
    pub request_key: Option<String>,
}

impl LeadPayload {
    pub fn validate(&self) -> ValidationResult<NewLead> {
        let mut errors = FieldErrors::new();

        let name = errors.capture("name", validate::required_text(&self.name, 120));
        let email = errors.capture("email", validate::optional_email(self.email.as_deref()));
        let phone = errors.capture("phone", validate::optional_text(self.phone.as_deref(), 40));
        let notes = errors.capture("notes", validate::optional_text(self.notes.as_deref(), 2000));
        let request_key = errors.capture(
            "request_key",
            validate::optional_text(self.request_key.as_deref(), 80),
        );

        let (name, email, phone, notes, request_key) =
            match (name, email, phone, notes, request_key) {
                (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
                _ => return Err(errors),
            };

        errors.into_result(NewLead {
            name,
            email,
            phone,
            channel_id: none_if_blank(self.channel_id.as_deref()),
            agent_id: none_if_blank(self.agent_id.as_deref()),
            stage_id: none_if_blank(self.stage_id.as_deref()),
            notes,
            request_key,
        })
    }
}

fn none_if_blank(value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        None | Some("") => None,
        Some(v) => Some(v.to_string()),
    }
}

/// Outcome of a create: the lead plus whether a row was actually inserted
#[derive(Debug, Clone)]
pub struct CreatedLead {
    pub lead: Lead,
    pub created: bool,
}

/// Kanban column: a stage with its leads
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub stage: PipelineStage,
    pub leads: Vec<Lead>,
}

/// Create a lead, defaulting to the first stage of the lead pipeline
///
/// With a `request_key`, a duplicate submission (including a lost race
/// against the unique index) resolves to the existing row.
pub async fn create_lead(pool: &SqlitePool, studio_id: &str, new: &NewLead) -> Result<CreatedLead> {
    if let Some(key) = &new.request_key {
        if let Some(existing) = find_by_request_key(pool, studio_id, key).await? {
            return Ok(CreatedLead {
                lead: existing,
                created: false,
            });
        }
    }

    let stage_id = match &new.stage_id {
        Some(stage_id) => {
            verify_stage(pool, studio_id, stage_id).await?;
            stage_id.clone()
        }
        None => first_stage_id(pool, studio_id).await?,
    };

    if let Some(agent_id) = &new.agent_id {
        verify_agent(pool, studio_id, agent_id).await?;
    }

    let guid = Uuid::new_v4().to_string();
    let insert = sqlx::query(
        r#"
        INSERT INTO leads (guid, studio_id, stage_id, agent_id, channel_id, name, email, phone, notes, request_key)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(studio_id)
    .bind(&stage_id)
    .bind(&new.agent_id)
    .bind(&new.channel_id)
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.notes)
    .bind(&new.request_key)
    .execute(pool)
    .await;

    match insert {
        Ok(_) => Ok(CreatedLead {
            lead: get_lead(pool, studio_id, &guid).await?,
            created: true,
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            // Lost the double-submit race; the winning row is the lead
            let key = new
                .request_key
                .as_deref()
                .ok_or_else(|| Error::Database(sqlx::Error::Database(db_err)))?;
            let existing = find_by_request_key(pool, studio_id, key)
                .await?
                .ok_or_else(|| Error::Internal("Duplicate lead vanished".to_string()))?;
            Ok(CreatedLead {
                lead: existing,
                created: false,
            })
        }
        Err(e) => Err(e.into()),
    }
}

async fn find_by_request_key(
    pool: &SqlitePool,
    studio_id: &str,
    key: &str,
) -> Result<Option<Lead>> {
    let lead = sqlx::query_as::<_, Lead>(
        "SELECT * FROM leads WHERE studio_id = ? AND request_key = ?",
    )
    .bind(studio_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(lead)
}

async fn first_stage_id(pool: &SqlitePool, studio_id: &str) -> Result<String> {
    sqlx::query_scalar(
        r#"
        SELECT guid FROM pipeline_stages
        WHERE studio_id = ? AND pipeline_type = 'lead' AND active = 1
        ORDER BY position ASC LIMIT 1
        "#,
    )
    .bind(studio_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::InvalidInput("Studio has no active lead stages".to_string()))
}

async fn verify_stage(pool: &SqlitePool, studio_id: &str, stage_id: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM pipeline_stages WHERE guid = ? AND studio_id = ? AND active = 1)",
    )
    .bind(stage_id)
    .bind(studio_id)
    .fetch_one(pool)
    .await?;

    if !exists {
        return Err(Error::NotFound(format!("Stage not found: {}", stage_id)));
    }
    Ok(())
}

async fn verify_agent(pool: &SqlitePool, studio_id: &str, agent_id: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM agents WHERE guid = ? AND studio_id = ?)",
    )
    .bind(agent_id)
    .bind(studio_id)
    .fetch_one(pool)
    .await?;

    if !exists {
        return Err(Error::NotFound(format!("Agent not found: {}", agent_id)));
    }
    Ok(())
}

/// List leads, optionally filtered by stage and/or agent
pub async fn list_leads(
    pool: &SqlitePool,
    studio_id: &str,
    stage_id: Option<&str>,
    agent_id: Option<&str>,
) -> Result<Vec<Lead>> {
    let leads = sqlx::query_as::<_, Lead>(
        r#"
        SELECT * FROM leads
        WHERE studio_id = ?
          AND (? IS NULL OR stage_id = ?)
          AND (? IS NULL OR agent_id = ?)
        ORDER BY created_at DESC, guid DESC
        "#,
    )
    .bind(studio_id)
    .bind(stage_id)
    .bind(stage_id)
    .bind(agent_id)
    .bind(agent_id)
    .fetch_all(pool)
    .await?;

    Ok(leads)
}

/// Kanban board: active stages in display order, each with its leads
pub async fn board(
    pool: &SqlitePool,
    studio_id: &str,
    pipeline_type: &str,
) -> Result<Vec<BoardColumn>> {
    let stages = crate::db::stages::list_stages(pool, studio_id, pipeline_type).await?;

    let mut columns = Vec::with_capacity(stages.len());
    for stage in stages {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE studio_id = ? AND stage_id = ?
            ORDER BY created_at DESC, guid DESC
            "#,
        )
        .bind(studio_id)
        .bind(&stage.guid)
        .fetch_all(pool)
        .await?;

        columns.push(BoardColumn { stage, leads });
    }

    Ok(columns)
}

pub async fn get_lead(pool: &SqlitePool, studio_id: &str, lead_id: &str) -> Result<Lead> {
    sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE guid = ? AND studio_id = ?")
        .bind(lead_id)
        .bind(studio_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lead not found: {}", lead_id)))
}

/// Update a lead's contact fields and assignments. Stage moves go through
/// [`move_lead_stage`].
pub async fn update_lead(
    pool: &SqlitePool,
    studio_id: &str,
    lead_id: &str,
    new: &NewLead,
) -> Result<Lead> {
    if let Some(agent_id) = &new.agent_id {
        verify_agent(pool, studio_id, agent_id).await?;
    }

    let result = sqlx::query(
        r#"
        UPDATE leads
        SET name = ?, email = ?, phone = ?, channel_id = ?, agent_id = ?, notes = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.channel_id)
    .bind(&new.agent_id)
    .bind(&new.notes)
    .bind(lead_id)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Lead not found: {}", lead_id)));
    }

    get_lead(pool, studio_id, lead_id).await
}

/// Move a lead to another stage of the same studio
///
/// The single-row UPDATE touches exactly the addressed lead; no other
/// lead's stage can change as a side effect.
pub async fn move_lead_stage(
    pool: &SqlitePool,
    studio_id: &str,
    lead_id: &str,
    stage_id: &str,
) -> Result<Lead> {
    verify_stage(pool, studio_id, stage_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE leads
        SET stage_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(stage_id)
    .bind(lead_id)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Lead not found: {}", lead_id)));
    }

    get_lead(pool, studio_id, lead_id).await
}

pub async fn delete_lead(pool: &SqlitePool, studio_id: &str, lead_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM leads WHERE guid = ? AND studio_id = ?")
        .bind(lead_id)
        .bind(studio_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Lead not found: {}", lead_id)));
    }

    Ok(())
}
