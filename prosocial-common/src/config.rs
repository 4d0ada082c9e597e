//! Configuration loading and data directory resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Service configuration loaded from the database
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub email_relay_url: Option<String>,
}

/// Optional TOML configuration file contents
///
/// All fields are optional; missing files or fields fall back to the next
/// resolution tier.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct TomlConfig {
    pub data_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub email_relay_url: Option<String>,
}

/// Data directory resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config) = load_toml_config() {
        if let Some(data_dir) = config.data_dir {
            return Ok(data_dir);
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_dir())
}

/// Load the optional TOML config file
///
/// Looks in the user config directory first, then `/etc/prosocial/config.toml`
/// on Linux. A missing or unparseable file is an error the caller may ignore.
pub fn load_toml_config() -> Result<TomlConfig> {
    let config_path = find_config_file()?;
    let toml_content = std::fs::read_to_string(&config_path)?;
    toml::from_str(&toml_content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", config_path.display(), e)))
}

/// Get configuration file path for the platform
fn find_config_file() -> Result<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("prosocial").join("config.toml")) {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/prosocial/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default data directory path
pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/prosocial (or /var/lib/prosocial for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("prosocial"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/prosocial"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/prosocial
        dirs::data_dir()
            .map(|d| d.join("prosocial"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/prosocial"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\prosocial
        dirs::data_local_dir()
            .map(|d| d.join("prosocial"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\prosocial"))
    } else {
        PathBuf::from("./prosocial_data")
    }
}

/// Database file path inside the data directory
pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("prosocial.db")
}

/// Load service configuration from database settings
pub async fn load_service_config(db: &sqlx::SqlitePool) -> Result<ServiceConfig> {
    let host: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'http_host'")
            .fetch_optional(db)
            .await?;

    let port: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'http_port'")
            .fetch_optional(db)
            .await?;

    let email_relay_url: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'email_relay_url'")
            .fetch_optional(db)
            .await?;

    let port = port
        .as_deref()
        .unwrap_or("5780")
        .parse::<u16>()
        .map_err(|e| Error::Config(format!("Invalid http_port setting: {}", e)))?;

    Ok(ServiceConfig {
        host: host.unwrap_or_else(|| "127.0.0.1".to_string()),
        port,
        email_relay_url: email_relay_url.filter(|v| !v.is_empty()),
    })
}
