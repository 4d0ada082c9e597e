//! Integration tests for database initialization
//!
//! Covers automatic database creation, idempotent re-initialization,
//! default settings, and lookup table seeding.

use prosocial_common::db::init::init_database;
use std::path::PathBuf;

fn temp_db_path(tag: &str) -> PathBuf {
    PathBuf::from(format!(
        "/tmp/prosocial-test-db-{}-{}.db",
        tag,
        std::process::id()
    ))
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let db_path = temp_db_path("create");
    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let db_path = temp_db_path("existing");
    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Second init must be a no-op, not a failure
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let db_path = temp_db_path("settings");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(count >= 7, "Expected 7+ default settings, got {}", count);

    let port: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'http_port'")
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert_eq!(port.as_deref(), Some("5780"));

    let relay: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'email_relay_url'")
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert_eq!(relay.as_deref(), Some(""));

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_lookup_tables_seeded() {
    let db_path = temp_db_path("lookups");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let channels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM acquisition_channels")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(channels >= 5, "Expected seeded channels, got {}", channels);

    let platforms: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM advertising_platforms")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(platforms >= 3, "Expected seeded platforms, got {}", platforms);

    // Re-init must not duplicate lookup rows
    drop(pool);
    let pool = init_database(&db_path).await.unwrap();
    let channels_again: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM acquisition_channels")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(channels, channels_again);

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_schema_version_recorded() {
    let db_path = temp_db_path("version");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert_eq!(version, Some(1));

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let db_path = temp_db_path("fk");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    // Lead referencing a nonexistent studio/stage must be rejected
    let result = sqlx::query(
        "INSERT INTO leads (guid, studio_id, stage_id, name) VALUES ('l1', 'no-studio', 'no-stage', 'Ana')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Foreign keys are not enforced");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}
