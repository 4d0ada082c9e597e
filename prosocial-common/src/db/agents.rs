//! Sales agent queries

use crate::db::models::Agent;
use crate::validate::{self, FieldErrors, ValidationResult};
use crate::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create/update payload for an agent
#[derive(Debug, Clone, Deserialize)]
pub struct AgentPayload {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub monthly_lead_goal: Option<i64>,
    pub commission_rate: Option<f64>,
    pub active: Option<bool>,
}

/// Validated agent fields
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub monthly_lead_goal: i64,
    pub commission_rate: f64,
    pub active: bool,
}

impl AgentPayload {
    pub fn validate(&self) -> ValidationResult<NewAgent> {
        let mut errors = FieldErrors::new();

        let name = errors.capture("name", validate::required_text(&self.name, 120));
        let email = errors.capture("email", validate::optional_email(self.email.as_deref()));
        let phone = errors.capture("phone", validate::optional_text(self.phone.as_deref(), 40));
        let goal = errors.capture(
            "monthly_lead_goal",
            validate::int_in_range(self.monthly_lead_goal.unwrap_or(0), 0, 100_000),
        );

        let commission_rate = self.commission_rate.unwrap_or(0.0);
        if !(0.0..=100.0).contains(&commission_rate) || !commission_rate.is_finite() {
            errors.add("commission_rate", "must be between 0 and 100");
        }

        let (name, email, phone, goal) = match (name, email, phone, goal) {
            (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
            _ => return Err(errors),
        };

        errors.into_result(NewAgent {
            name,
            email,
            phone,
            monthly_lead_goal: goal,
            commission_rate,
            active: self.active.unwrap_or(true),
        })
    }
}

pub async fn list_agents(pool: &SqlitePool, studio_id: &str) -> Result<Vec<Agent>> {
    let agents = sqlx::query_as::<_, Agent>(
        "SELECT * FROM agents WHERE studio_id = ? ORDER BY name ASC",
    )
    .bind(studio_id)
    .fetch_all(pool)
    .await?;

    Ok(agents)
}

pub async fn get_agent(pool: &SqlitePool, studio_id: &str, agent_id: &str) -> Result<Agent> {
    sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE guid = ? AND studio_id = ?")
        .bind(agent_id)
        .bind(studio_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Agent not found: {}", agent_id)))
}

pub async fn create_agent(pool: &SqlitePool, studio_id: &str, new: &NewAgent) -> Result<Agent> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO agents (guid, studio_id, name, email, phone, monthly_lead_goal, commission_rate, active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(studio_id)
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(new.monthly_lead_goal)
    .bind(new.commission_rate)
    .bind(new.active)
    .execute(pool)
    .await?;

    get_agent(pool, studio_id, &guid).await
}

pub async fn update_agent(
    pool: &SqlitePool,
    studio_id: &str,
    agent_id: &str,
    new: &NewAgent,
) -> Result<Agent> {
    let result = sqlx::query(
        r#"
        UPDATE agents
        SET name = ?, email = ?, phone = ?, monthly_lead_goal = ?, commission_rate = ?, active = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(new.monthly_lead_goal)
    .bind(new.commission_rate)
    .bind(new.active)
    .bind(agent_id)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Agent not found: {}", agent_id)));
    }

    get_agent(pool, studio_id, agent_id).await
}

/// Delete an agent. Leads keep their row with the assignment cleared.
pub async fn delete_agent(pool: &SqlitePool, studio_id: &str, agent_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM agents WHERE guid = ? AND studio_id = ?")
        .bind(agent_id)
        .bind(studio_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Agent not found: {}", agent_id)));
    }

    Ok(())
}
