//! Database initialization
//!
//! Creates the database file on first run, applies the schema idempotently,
//! runs versioned migrations, and seeds default settings and lookup tables.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection pragmas: foreign keys on every pooled connection, WAL
    // for concurrent readers with one writer, busy timeout for contention
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Schema creation (idempotent - safe to call multiple times)
    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_studios_table(&pool).await?;
    create_acquisition_channels_table(&pool).await?;
    create_advertising_platforms_table(&pool).await?;
    create_pipeline_stages_table(&pool).await?;
    create_agents_table(&pool).await?;
    create_leads_table(&pool).await?;
    create_services_table(&pool).await?;
    create_packages_table(&pool).await?;
    create_package_services_table(&pool).await?;
    create_expenses_table(&pool).await?;
    create_plans_table(&pool).await?;
    create_subscriptions_table(&pool).await?;
    create_payments_table(&pool).await?;

    // Versioned migrations for databases created by older builds
    crate::db::migrations::run_migrations(&pool).await?;

    // Default settings and lookup seeding
    init_default_settings(&pool).await?;
    seed_acquisition_channels(&pool).await?;
    seed_advertising_platforms(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the studios table
///
/// One row per tenant. Every tenant-scoped table references this one.
pub async fn create_studios_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studios (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            email TEXT,
            phone TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_studios_slug ON studios(slug)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_acquisition_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS acquisition_channels (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_advertising_platforms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS advertising_platforms (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the pipeline_stages table
///
/// `position` is a dense display order per (studio, pipeline_type). It is
/// not UNIQUE-constrained so a transactional reorder can update rows freely.
pub async fn create_pipeline_stages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_stages (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            pipeline_type TEXT NOT NULL DEFAULT 'lead' CHECK (pipeline_type IN ('lead', 'client')),
            name TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT '#9e9e9e',
            position INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (position >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stages_studio_order ON pipeline_stages(studio_id, pipeline_type, position)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the agents table
pub async fn create_agents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agents (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            monthly_lead_goal INTEGER NOT NULL DEFAULT 0,
            commission_rate REAL NOT NULL DEFAULT 0.0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (monthly_lead_goal >= 0),
            CHECK (commission_rate >= 0.0 AND commission_rate <= 100.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_agents_studio ON agents(studio_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the leads table
///
/// A lead always references exactly one stage. The stage reference is
/// RESTRICT so stages with leads cannot be deleted out from under them.
pub async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            stage_id TEXT NOT NULL REFERENCES pipeline_stages(guid) ON DELETE RESTRICT,
            agent_id TEXT REFERENCES agents(guid) ON DELETE SET NULL,
            channel_id TEXT REFERENCES acquisition_channels(guid) ON DELETE SET NULL,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            notes TEXT,
            request_key TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_studio_stage ON leads(studio_id, stage_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_studio_agent ON leads(studio_id, agent_id)")
        .execute(pool)
        .await?;
    // Duplicate create submissions with the same request_key resolve to one row
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_leads_request_key ON leads(studio_id, request_key) WHERE request_key IS NOT NULL",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the services table
pub async fn create_services_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            category TEXT,
            price_cents INTEGER NOT NULL,
            visible INTEGER NOT NULL DEFAULT 1,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (price_cents >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_services_studio ON services(studio_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the packages table
pub async fn create_packages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS packages (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            event_type TEXT,
            price_cents INTEGER NOT NULL,
            visible INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (price_cents >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_packages_studio ON packages(studio_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the package_services linking table
///
/// `service_id` is RESTRICT: a service referenced by a package cannot be
/// deleted until the package drops it.
pub async fn create_package_services_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS package_services (
            package_id TEXT NOT NULL REFERENCES packages(guid) ON DELETE CASCADE,
            service_id TEXT NOT NULL REFERENCES services(guid) ON DELETE RESTRICT,
            quantity INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (package_id, service_id),
            CHECK (quantity >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_package_services_service ON package_services(service_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the expenses table
pub async fn create_expenses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            description TEXT NOT NULL,
            category TEXT,
            amount_cents INTEGER NOT NULL,
            due_date TEXT,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'paid')),
            paid_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (amount_cents >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_expenses_studio_status ON expenses(studio_id, status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_expenses_studio_due ON expenses(studio_id, due_date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the plans table
pub async fn create_plans_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plans (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            price_cents INTEGER NOT NULL,
            billing_interval TEXT NOT NULL DEFAULT 'monthly' CHECK (billing_interval IN ('monthly', 'yearly')),
            lead_quota INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (price_cents >= 0),
            CHECK (lead_quota >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the subscriptions table
pub async fn create_subscriptions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            plan_id TEXT NOT NULL REFERENCES plans(guid) ON DELETE RESTRICT,
            status TEXT NOT NULL DEFAULT 'trialing' CHECK (status IN ('trialing', 'active', 'past_due', 'canceled')),
            current_period_end TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_subscriptions_studio ON subscriptions(studio_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_subscriptions_plan ON subscriptions(plan_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the payments table
pub async fn create_payments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            guid TEXT PRIMARY KEY,
            subscription_id TEXT NOT NULL REFERENCES subscriptions(guid) ON DELETE CASCADE,
            external_ref TEXT NOT NULL UNIQUE,
            amount_cents INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed', 'failed')),
            paid_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (amount_cents >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_payments_subscription ON payments(subscription_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values and resets NULL
/// values back to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // HTTP server settings
    ensure_setting(pool, "http_host", "127.0.0.1").await?;
    ensure_setting(pool, "http_port", "5780").await?;
    ensure_setting(pool, "http_request_timeout_ms", "30000").await?;
    ensure_setting(pool, "http_max_body_size_bytes", "1048576").await?;

    // Outbound email relay (empty = email disabled)
    ensure_setting(pool, "email_relay_url", "").await?;
    ensure_setting(pool, "email_from", "no-reply@prosocial.app").await?;

    // Billing settings
    ensure_setting(pool, "trial_period_days", "14").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // Use INSERT OR IGNORE to handle concurrent initialization race conditions
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

async fn seed_acquisition_channels(pool: &SqlitePool) -> Result<()> {
    let defaults = [
        "Instagram",
        "Facebook",
        "Google Search",
        "Referral",
        "Fairs & Events",
        "Website",
        "Other",
    ];

    for name in defaults {
        sqlx::query("INSERT OR IGNORE INTO acquisition_channels (guid, name) VALUES (?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn seed_advertising_platforms(pool: &SqlitePool) -> Result<()> {
    let defaults = ["Meta Ads", "Google Ads", "TikTok Ads", "Pinterest Ads"];

    for name in defaults {
        sqlx::query("INSERT OR IGNORE INTO advertising_platforms (guid, name) VALUES (?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}
