//! Catalog queries: services and the packages that bundle them
//!
//! Prices arrive as user-typed strings and are coerced to integer cents by
//! the validation layer before anything touches the database.

use crate::db::models::{Package, PackageServiceLine, Service};
use crate::validate::{self, FieldErrors, ValidationResult};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

// ========================================
// Services
// ========================================

/// Create/update payload for a service
#[derive(Debug, Clone, Deserialize)]
pub struct ServicePayload {
    pub name: String,
    pub category: Option<String>,
    /// Price as submitted, e.g. `"1250.00"`
    pub price: String,
    pub visible: Option<bool>,
    pub active: Option<bool>,
}

/// Validated service fields
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    pub visible: bool,
    pub active: bool,
}

impl ServicePayload {
    pub fn validate(&self) -> ValidationResult<NewService> {
        let mut errors = FieldErrors::new();

        let name = errors.capture("name", validate::required_text(&self.name, 120));
        let category =
            errors.capture("category", validate::optional_text(self.category.as_deref(), 60));
        let price_cents = errors.capture("price", validate::money_cents(&self.price));

        let (name, category, price_cents) = match (name, category, price_cents) {
            (Some(n), Some(c), Some(p)) => (n, c, p),
            _ => return Err(errors),
        };

        errors.into_result(NewService {
            name,
            category,
            price_cents,
            visible: self.visible.unwrap_or(true),
            active: self.active.unwrap_or(true),
        })
    }
}

pub async fn list_services(pool: &SqlitePool, studio_id: &str) -> Result<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT * FROM services WHERE studio_id = ? ORDER BY name ASC",
    )
    .bind(studio_id)
    .fetch_all(pool)
    .await?;

    Ok(services)
}

/// Services shown on the public profile page
pub async fn list_visible_services(pool: &SqlitePool, studio_id: &str) -> Result<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT * FROM services WHERE studio_id = ? AND visible = 1 AND active = 1 ORDER BY name ASC",
    )
    .bind(studio_id)
    .fetch_all(pool)
    .await?;

    Ok(services)
}

pub async fn get_service(pool: &SqlitePool, studio_id: &str, service_id: &str) -> Result<Service> {
    sqlx::query_as::<_, Service>("SELECT * FROM services WHERE guid = ? AND studio_id = ?")
        .bind(service_id)
        .bind(studio_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Service not found: {}", service_id)))
}

pub async fn create_service(pool: &SqlitePool, studio_id: &str, new: &NewService) -> Result<Service> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO services (guid, studio_id, name, category, price_cents, visible, active)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(studio_id)
    .bind(&new.name)
    .bind(&new.category)
    .bind(new.price_cents)
    .bind(new.visible)
    .bind(new.active)
    .execute(pool)
    .await?;

    get_service(pool, studio_id, &guid).await
}

pub async fn update_service(
    pool: &SqlitePool,
    studio_id: &str,
    service_id: &str,
    new: &NewService,
) -> Result<Service> {
    let result = sqlx::query(
        r#"
        UPDATE services
        SET name = ?, category = ?, price_cents = ?, visible = ?, active = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(&new.name)
    .bind(&new.category)
    .bind(new.price_cents)
    .bind(new.visible)
    .bind(new.active)
    .bind(service_id)
    .bind(studio_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Service not found: {}", service_id)));
    }

    get_service(pool, studio_id, service_id).await
}

/// Delete a service. Refused while a package still references it.
pub async fn delete_service(pool: &SqlitePool, studio_id: &str, service_id: &str) -> Result<()> {
    let package_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM package_services WHERE service_id = ?")
            .bind(service_id)
            .fetch_one(pool)
            .await?;

    if package_count > 0 {
        return Err(Error::Conflict(format!(
            "Service is used by {} package(s); remove it from them first",
            package_count
        )));
    }

    let result = sqlx::query("DELETE FROM services WHERE guid = ? AND studio_id = ?")
        .bind(service_id)
        .bind(studio_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Service not found: {}", service_id)));
    }

    Ok(())
}

// ========================================
// Packages
// ========================================

/// One service line of a package payload
#[derive(Debug, Clone, Deserialize)]
pub struct PackageServiceInput {
    pub service_id: String,
    pub quantity: Option<i64>,
}

/// Create/update payload for a package
#[derive(Debug, Clone, Deserialize)]
pub struct PackagePayload {
    pub name: String,
    pub event_type: Option<String>,
    /// Price as submitted, e.g. `"4990,00"`
    pub price: String,
    pub visible: Option<bool>,
    #[serde(default)]
    pub services: Vec<PackageServiceInput>,
}

/// Validated package fields
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub name: String,
    pub event_type: Option<String>,
    pub price_cents: i64,
    pub visible: bool,
    pub services: Vec<(String, i64)>,
}

impl PackagePayload {
    pub fn validate(&self) -> ValidationResult<NewPackage> {
        let mut errors = FieldErrors::new();

        let name = errors.capture("name", validate::required_text(&self.name, 120));
        let event_type =
            errors.capture("event_type", validate::optional_text(self.event_type.as_deref(), 60));
        let price_cents = errors.capture("price", validate::money_cents(&self.price));

        let mut services = Vec::with_capacity(self.services.len());
        let mut seen = std::collections::HashSet::new();
        for (index, line) in self.services.iter().enumerate() {
            let service_id = line.service_id.trim();
            if service_id.is_empty() {
                errors.add(format!("services[{}].service_id", index), "is required");
                continue;
            }
            if !seen.insert(service_id.to_string()) {
                errors.add(
                    format!("services[{}].service_id", index),
                    "is listed more than once",
                );
                continue;
            }
            let quantity = line.quantity.unwrap_or(1);
            if !(1..=1000).contains(&quantity) {
                errors.add(
                    format!("services[{}].quantity", index),
                    "must be between 1 and 1000",
                );
                continue;
            }
            services.push((service_id.to_string(), quantity));
        }

        let (name, event_type, price_cents) = match (name, event_type, price_cents) {
            (Some(n), Some(e), Some(p)) => (n, e, p),
            _ => return Err(errors),
        };

        errors.into_result(NewPackage {
            name,
            event_type,
            price_cents,
            visible: self.visible.unwrap_or(true),
            services,
        })
    }
}

/// Package joined with its service lines
#[derive(Debug, Clone, Serialize)]
pub struct PackageDetail {
    #[serde(flatten)]
    pub package: Package,
    pub services: Vec<PackageServiceLine>,
}

pub async fn list_packages(pool: &SqlitePool, studio_id: &str) -> Result<Vec<PackageDetail>> {
    let packages = sqlx::query_as::<_, Package>(
        "SELECT * FROM packages WHERE studio_id = ? ORDER BY name ASC",
    )
    .bind(studio_id)
    .fetch_all(pool)
    .await?;

    with_service_lines(pool, packages).await
}

/// Packages shown on the public profile page
pub async fn list_visible_packages(pool: &SqlitePool, studio_id: &str) -> Result<Vec<PackageDetail>> {
    let packages = sqlx::query_as::<_, Package>(
        "SELECT * FROM packages WHERE studio_id = ? AND visible = 1 ORDER BY name ASC",
    )
    .bind(studio_id)
    .fetch_all(pool)
    .await?;

    with_service_lines(pool, packages).await
}

async fn with_service_lines(
    pool: &SqlitePool,
    packages: Vec<Package>,
) -> Result<Vec<PackageDetail>> {
    let mut details = Vec::with_capacity(packages.len());
    for package in packages {
        let services = service_lines(pool, &package.guid).await?;
        details.push(PackageDetail { package, services });
    }
    Ok(details)
}

async fn service_lines(pool: &SqlitePool, package_id: &str) -> Result<Vec<PackageServiceLine>> {
    let lines = sqlx::query_as::<_, PackageServiceLine>(
        r#"
        SELECT s.guid AS service_id, s.name, s.price_cents, ps.quantity
        FROM package_services ps
        JOIN services s ON s.guid = ps.service_id
        WHERE ps.package_id = ?
        ORDER BY s.name ASC
        "#,
    )
    .bind(package_id)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}

pub async fn get_package(
    pool: &SqlitePool,
    studio_id: &str,
    package_id: &str,
) -> Result<PackageDetail> {
    let package = sqlx::query_as::<_, Package>(
        "SELECT * FROM packages WHERE guid = ? AND studio_id = ?",
    )
    .bind(package_id)
    .bind(studio_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Package not found: {}", package_id)))?;

    let services = service_lines(pool, &package.guid).await?;
    Ok(PackageDetail { package, services })
}

/// Create a package and its service links in one transaction
pub async fn create_package(
    pool: &SqlitePool,
    studio_id: &str,
    new: &NewPackage,
) -> Result<PackageDetail> {
    let guid = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO packages (guid, studio_id, name, event_type, price_cents, visible)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(studio_id)
    .bind(&new.name)
    .bind(&new.event_type)
    .bind(new.price_cents)
    .bind(new.visible)
    .execute(&mut *tx)
    .await?;

    insert_service_links(&mut tx, studio_id, &guid, &new.services).await?;

    tx.commit().await?;

    get_package(pool, studio_id, &guid).await
}

/// Replace a package's fields and service links in one transaction
pub async fn update_package(
    pool: &SqlitePool,
    studio_id: &str,
    package_id: &str,
    new: &NewPackage,
) -> Result<PackageDetail> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE packages
        SET name = ?, event_type = ?, price_cents = ?, visible = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ? AND studio_id = ?
        "#,
    )
    .bind(&new.name)
    .bind(&new.event_type)
    .bind(new.price_cents)
    .bind(new.visible)
    .bind(package_id)
    .bind(studio_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Package not found: {}", package_id)));
    }

    sqlx::query("DELETE FROM package_services WHERE package_id = ?")
        .bind(package_id)
        .execute(&mut *tx)
        .await?;

    insert_service_links(&mut tx, studio_id, package_id, &new.services).await?;

    tx.commit().await?;

    get_package(pool, studio_id, package_id).await
}

async fn insert_service_links(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    studio_id: &str,
    package_id: &str,
    services: &[(String, i64)],
) -> Result<()> {
    for (service_id, quantity) in services {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM services WHERE guid = ? AND studio_id = ?)",
        )
        .bind(service_id)
        .bind(studio_id)
        .fetch_one(&mut **tx)
        .await?;

        if !exists {
            let mut errors = FieldErrors::new();
            errors.add("services", format!("Unknown service: {}", service_id));
            return Err(Error::Validation(errors));
        }

        sqlx::query(
            "INSERT INTO package_services (package_id, service_id, quantity) VALUES (?, ?, ?)",
        )
        .bind(package_id)
        .bind(service_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

pub async fn delete_package(pool: &SqlitePool, studio_id: &str, package_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM packages WHERE guid = ? AND studio_id = ?")
        .bind(package_id)
        .bind(studio_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Package not found: {}", package_id)));
    }

    Ok(())
}
