//! Pipeline stage queries
//!
//! Stages are the ordered phases a lead moves through. Ordering is a dense
//! `position` per (studio, pipeline_type) used for display only; any stage
//! is reachable from any other.

use crate::db::models::PipelineStage;
use crate::validate::{self, FieldErrors, ValidationResult};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

/// Known pipeline types
pub const PIPELINE_TYPES: &[&str] = &["lead", "client"];

/// Stages seeded for every new studio's lead pipeline
const DEFAULT_LEAD_STAGES: &[(&str, &str)] = &[
    ("New", "#42a5f5"),
    ("Contacted", "#ab47bc"),
    ("Proposal Sent", "#ffa726"),
    ("Won", "#66bb6a"),
    ("Lost", "#ef5350"),
];

/// Create/update payload for a stage
#[derive(Debug, Clone, Deserialize)]
pub struct StagePayload {
    pub name: String,
    pub color: Option<String>,
    pub pipeline_type: Option<String>,
    pub active: Option<bool>,
}

/// Validated stage fields
#[derive(Debug, Clone)]
pub struct NewStage {
    pub name: String,
    pub color: Option<String>,
    pub pipeline_type: String,
    pub active: bool,
}

impl StagePayload {
    pub fn validate(&self) -> ValidationResult<NewStage> {
        let mut errors = FieldErrors::new();

        let name = errors.capture("name", validate::required_text(&self.name, 80));
        let color = match self.color.as_deref().map(str::trim) {
            None | Some("") => Some(None),
            Some(raw) => errors.capture("color", validate::hex_color(raw)).map(Some),
        };
        let pipeline_type = errors.capture(
            "pipeline_type",
            validate::one_of(self.pipeline_type.as_deref().unwrap_or("lead"), PIPELINE_TYPES),
        );

        let (name, color, pipeline_type) = match (name, color, pipeline_type) {
            (Some(n), Some(c), Some(p)) => (n, c, p),
            _ => return Err(errors),
        };

        errors.into_result(NewStage {
            name,
            color,
            pipeline_type,
            active: self.active.unwrap_or(true),
        })
    }
}

/// One entry of a reorder submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StagePosition {
    pub stage_id: String,
    pub position: i64,
}

/// Seed the default lead pipeline for a new studio
pub async fn seed_default_stages(tx: &mut Transaction<'_, Sqlite>, studio_id: &str) -> Result<()> {
    for (position, (name, color)) in DEFAULT_LEAD_STAGES.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO pipeline_stages (guid, studio_id, pipeline_type, name, color, position)
            VALUES (?, ?, 'lead', ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(studio_id)
        .bind(name)
        .bind(color)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// List active stages ordered by position
///
/// No pagination: stage sets are small and human-curated.
pub async fn list_stages(
    pool: &SqlitePool,
    studio_id: &str,
    pipeline_type: &str,
) -> Result<Vec<PipelineStage>> {
    let stages = sqlx::query_as::<_, PipelineStage>(
        r#"
        SELECT * FROM pipeline_stages
        WHERE studio_id = ? AND pipeline_type = ? AND active = 1
        ORDER BY position ASC
        "#,
    )
    .bind(studio_id)
    .bind(pipeline_type)
    .fetch_all(pool)
    .await?;

    Ok(stages)
}

pub async fn get_stage(pool: &SqlitePool, studio_id: &str, stage_id: &str) -> Result<PipelineStage> {
    sqlx::query_as::<_, PipelineStage>(
        "SELECT * FROM pipeline_stages WHERE guid = ? AND studio_id = ?",
    )
    .bind(stage_id)
    .bind(studio_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Stage not found: {}", stage_id)))
}

/// Create a stage at the end of its pipeline
pub async fn create_stage(
    pool: &SqlitePool,
    studio_id: &str,
    new: &NewStage,
) -> Result<PipelineStage> {
    let guid = Uuid::new_v4().to_string();

    let next_position: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(MAX(position) + 1, 0) FROM pipeline_stages
        WHERE studio_id = ? AND pipeline_type = ?
        "#,
    )
    .bind(studio_id)
    .bind(&new.pipeline_type)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO pipeline_stages (guid, studio_id, pipeline_type, name, color, position, active)
        VALUES (?, ?, ?, ?, COALESCE(?, '#9e9e9e'), ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(studio_id)
    .bind(&new.pipeline_type)
    .bind(&new.name)
    .bind(&new.color)
    .bind(next_position)
    .bind(new.active)
    .execute(pool)
    .await?;

    get_stage(pool, studio_id, &guid).await
}

/// Update a stage's name, color or active flag. Pipeline type is fixed.
pub async fn update_stage(
    pool: &SqlitePool,
    studio_id: &str,
    stage_id: &str,
    new: &NewStage,
) -> Result<PipelineStage> {
    let result = sqlx::query(
        r#"
        UPDATE pipeline_stages
        SET name = ?, color = COALESCE(?, color), active = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(&new.name)
    .bind(&new.color)
    .bind(new.active)
    .bind(stage_id)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Stage not found: {}", stage_id)));
    }

    get_stage(pool, studio_id, stage_id).await
}

/// Delete a stage. Refused while leads still reference it.
pub async fn delete_stage(pool: &SqlitePool, studio_id: &str, stage_id: &str) -> Result<()> {
    let lead_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE stage_id = ?")
        .bind(stage_id)
        .fetch_one(pool)
        .await?;

    if lead_count > 0 {
        return Err(Error::Conflict(format!(
            "Stage still has {} lead(s); move them before deleting",
            lead_count
        )));
    }

    let result = sqlx::query("DELETE FROM pipeline_stages WHERE guid = ? AND studio_id = ?")
        .bind(stage_id)
        .bind(studio_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Stage not found: {}", stage_id)));
    }

    Ok(())
}

/// Reorder the active stages of a pipeline in one transaction
///
/// The submission must cover exactly the active stages of the pipeline and
/// its positions must be a permutation of 0..n. Concurrent reorders
/// serialize at the database; the last committed transaction wins whole.
pub async fn reorder_stages(
    pool: &SqlitePool,
    studio_id: &str,
    pipeline_type: &str,
    moves: &[StagePosition],
) -> Result<Vec<PipelineStage>> {
    let mut tx = pool.begin().await?;

    let current_ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT guid FROM pipeline_stages
        WHERE studio_id = ? AND pipeline_type = ? AND active = 1
        "#,
    )
    .bind(studio_id)
    .bind(pipeline_type)
    .fetch_all(&mut *tx)
    .await?;

    validate_reorder(&current_ids, moves)?;

    for entry in moves {
        sqlx::query(
            r#"
            UPDATE pipeline_stages
            SET position = ?, updated_at = CURRENT_TIMESTAMP
            WHERE guid = ? AND studio_id = ?
            "#,
        )
        .bind(entry.position)
        .bind(&entry.stage_id)
        .bind(studio_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    list_stages(pool, studio_id, pipeline_type).await
}

/// Check a reorder submission against the stages it claims to cover
///
/// The resulting position set must be a permutation: every active stage
/// present exactly once, positions exactly 0..n.
fn validate_reorder(current_ids: &[String], moves: &[StagePosition]) -> Result<()> {
    if moves.len() != current_ids.len() {
        return Err(Error::InvalidInput(format!(
            "Reorder must cover all {} active stages, got {}",
            current_ids.len(),
            moves.len()
        )));
    }

    let mut seen_ids = std::collections::HashSet::new();
    for entry in moves {
        if !current_ids.iter().any(|id| id == &entry.stage_id) {
            return Err(Error::InvalidInput(format!(
                "Unknown or inactive stage in reorder: {}",
                entry.stage_id
            )));
        }
        if !seen_ids.insert(entry.stage_id.as_str()) {
            return Err(Error::InvalidInput(format!(
                "Duplicate stage in reorder: {}",
                entry.stage_id
            )));
        }
    }

    let mut positions: Vec<i64> = moves.iter().map(|m| m.position).collect();
    positions.sort_unstable();
    let dense = positions.iter().enumerate().all(|(i, p)| *p == i as i64);
    if !dense {
        return Err(Error::InvalidInput(
            "Positions must be a permutation of 0..n".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn moves(entries: &[(&str, i64)]) -> Vec<StagePosition> {
        entries
            .iter()
            .map(|(id, position)| StagePosition {
                stage_id: id.to_string(),
                position: *position,
            })
            .collect()
    }

    #[test]
    fn test_reorder_accepts_permutation() {
        let current = ids(&["a", "b", "c"]);
        let submission = moves(&[("c", 0), ("a", 1), ("b", 2)]);
        assert!(validate_reorder(&current, &submission).is_ok());
    }

    #[test]
    fn test_reorder_rejects_missing_stage() {
        let current = ids(&["a", "b", "c"]);
        let submission = moves(&[("a", 0), ("b", 1)]);
        assert!(validate_reorder(&current, &submission).is_err());
    }

    #[test]
    fn test_reorder_rejects_duplicate_stage() {
        let current = ids(&["a", "b", "c"]);
        let submission = moves(&[("a", 0), ("a", 1), ("b", 2)]);
        assert!(validate_reorder(&current, &submission).is_err());
    }

    #[test]
    fn test_reorder_rejects_duplicate_position() {
        let current = ids(&["a", "b", "c"]);
        let submission = moves(&[("a", 0), ("b", 0), ("c", 2)]);
        assert!(validate_reorder(&current, &submission).is_err());
    }

    #[test]
    fn test_reorder_rejects_sparse_positions() {
        let current = ids(&["a", "b", "c"]);
        let submission = moves(&[("a", 0), ("b", 1), ("c", 5)]);
        assert!(validate_reorder(&current, &submission).is_err());
    }

    #[test]
    fn test_reorder_rejects_unknown_stage() {
        let current = ids(&["a", "b"]);
        let submission = moves(&[("a", 0), ("z", 1)]);
        assert!(validate_reorder(&current, &submission).is_err());
    }
}
