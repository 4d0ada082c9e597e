//! Global lookup tables: acquisition channels and advertising platforms

use crate::db::models::{AcquisitionChannel, AdvertisingPlatform};
use crate::Result;
use sqlx::SqlitePool;

pub async fn list_acquisition_channels(pool: &SqlitePool) -> Result<Vec<AcquisitionChannel>> {
    let channels = sqlx::query_as::<_, AcquisitionChannel>(
        "SELECT guid, name, active FROM acquisition_channels WHERE active = 1 ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(channels)
}

pub async fn list_advertising_platforms(pool: &SqlitePool) -> Result<Vec<AdvertisingPlatform>> {
    let platforms = sqlx::query_as::<_, AdvertisingPlatform>(
        "SELECT guid, name, active FROM advertising_platforms WHERE active = 1 ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(platforms)
}
