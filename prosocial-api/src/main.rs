//! ProSocial API - Main entry point
//!
//! Multi-tenant backend service for creative studios: lead pipelines,
//! catalog management, expenses and reports, and subscription billing.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prosocial_api::{build_router, email::EmailClient, AppState};
use prosocial_common::api::auth::load_shared_secret;
use prosocial_common::{config, db};

/// Command-line arguments for prosocial-api
#[derive(Parser, Debug)]
#[command(name = "prosocial-api")]
#[command(about = "ProSocial Platform backend service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the stored setting)
    #[arg(short, long, env = "PROSOCIAL_PORT")]
    port: Option<u16>,

    /// Data directory containing the database
    #[arg(short, long, env = "PROSOCIAL_DATA_DIR")]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prosocial_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting ProSocial API v{}", env!("CARGO_PKG_VERSION"));

    // Resolve data directory: CLI arg, env var, config file, platform default
    let data_dir = config::resolve_data_dir(args.data_dir.as_deref(), "PROSOCIAL_DATA_DIR")
        .context("Failed to resolve data directory")?;
    let db_path = config::database_path(&data_dir);
    info!("Database path: {}", db_path.display());

    let pool = db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let service_config = config::load_service_config(&pool)
        .await
        .context("Failed to load service configuration")?;

    let shared_secret = load_shared_secret(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load shared secret: {}", e))?;
    if shared_secret == 0 {
        info!("API authentication disabled (shared_secret = 0)");
    } else {
        info!("✓ Loaded shared secret for API authentication");
    }

    let email_from = prosocial_common::db::settings::get_setting(&pool, "email_from")
        .await?
        .unwrap_or_else(|| "no-reply@prosocial.app".to_string());
    let email = EmailClient::new(service_config.email_relay_url.clone(), email_from);
    if service_config.email_relay_url.is_some() {
        info!("✓ Email relay configured");
    } else {
        info!("Email relay not configured (email_relay_url empty)");
    }

    let state = AppState::new(pool, shared_secret, email);
    let app = build_router(state);

    let port = args.port.unwrap_or(service_config.port);
    let host: std::net::IpAddr = service_config
        .host
        .parse()
        .context("Invalid http_host setting")?;
    let addr = SocketAddr::from((host, port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("prosocial-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
