//! Studio (tenant) queries

use crate::db::models::Studio;
use crate::validate::{self, FieldErrors, ValidationResult};
use crate::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create/update payload for a studio
#[derive(Debug, Clone, Deserialize)]
pub struct StudioPayload {
    pub name: String,
    pub slug: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

/// Validated studio fields
#[derive(Debug, Clone)]
pub struct NewStudio {
    pub name: String,
    pub slug: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
}

impl StudioPayload {
    pub fn validate(&self) -> ValidationResult<NewStudio> {
        let mut errors = FieldErrors::new();

        let name = errors.capture("name", validate::required_text(&self.name, 120));
        let slug = errors.capture("slug", validate::slug(&self.slug));
        let email = errors.capture("email", validate::optional_email(self.email.as_deref()));
        let phone = errors.capture("phone", validate::optional_text(self.phone.as_deref(), 40));

        let (name, slug, email, phone) = match (name, slug, email, phone) {
            (Some(n), Some(s), Some(e), Some(p)) => (n, s, e, p),
            _ => return Err(errors),
        };

        errors.into_result(NewStudio {
            name,
            slug,
            email,
            phone,
            active: self.active.unwrap_or(true),
        })
    }
}

/// Create a studio and seed its default lead pipeline
///
/// Runs in one transaction so a studio never exists without stages.
pub async fn create_studio(pool: &SqlitePool, new: &NewStudio) -> Result<Studio> {
    let guid = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM studios WHERE slug = ?)")
        .bind(&new.slug)
        .fetch_one(&mut *tx)
        .await?;
    if taken {
        return Err(Error::Conflict(format!("Slug already in use: {}", new.slug)));
    }

    sqlx::query(
        r#"
        INSERT INTO studios (guid, name, slug, email, phone, active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&new.name)
    .bind(&new.slug)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(new.active)
    .execute(&mut *tx)
    .await?;

    crate::db::stages::seed_default_stages(&mut tx, &guid).await?;

    tx.commit().await?;

    get_studio(pool, &guid).await
}

pub async fn list_studios(pool: &SqlitePool) -> Result<Vec<Studio>> {
    let studios = sqlx::query_as::<_, Studio>("SELECT * FROM studios ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    Ok(studios)
}

pub async fn get_studio(pool: &SqlitePool, studio_id: &str) -> Result<Studio> {
    sqlx::query_as::<_, Studio>("SELECT * FROM studios WHERE guid = ?")
        .bind(studio_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Studio not found: {}", studio_id)))
}

/// Look up an active studio by its public slug
pub async fn get_studio_by_slug(pool: &SqlitePool, slug: &str) -> Result<Studio> {
    sqlx::query_as::<_, Studio>("SELECT * FROM studios WHERE slug = ? AND active = 1")
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Studio not found: {}", slug)))
}

pub async fn update_studio(pool: &SqlitePool, studio_id: &str, new: &NewStudio) -> Result<Studio> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM studios WHERE slug = ? AND guid != ?)",
    )
    .bind(&new.slug)
    .bind(studio_id)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(Error::Conflict(format!("Slug already in use: {}", new.slug)));
    }

    let result = sqlx::query(
        r#"
        UPDATE studios
        SET name = ?, slug = ?, email = ?, phone = ?, active = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&new.name)
    .bind(&new.slug)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(new.active)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Studio not found: {}", studio_id)));
    }

    get_studio(pool, studio_id).await
}

/// Delete a studio and everything it owns
///
/// Children with RESTRICT references (leads before stages, packages before
/// services) are removed in order inside one transaction; the studio row
/// cascade covers the rest.
pub async fn delete_studio(pool: &SqlitePool, studio_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM leads WHERE studio_id = ?")
        .bind(studio_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM pipeline_stages WHERE studio_id = ?")
        .bind(studio_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM packages WHERE studio_id = ?")
        .bind(studio_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM services WHERE studio_id = ?")
        .bind(studio_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM studios WHERE guid = ?")
        .bind(studio_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Studio not found: {}", studio_id)));
    }

    tx.commit().await?;

    Ok(())
}
