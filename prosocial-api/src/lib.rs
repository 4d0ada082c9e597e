//! ProSocial API service library
//!
//! Multi-tenant backend for creative studios: lead pipelines, catalog and
//! package management, expenses and reports, subscription billing, and the
//! public studio profile.

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod email;

use email::EmailClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Shared secret for API authentication (0 disables auth)
    pub shared_secret: i64,
    /// Outbound email relay
    pub email: EmailClient,
}

impl AppState {
    pub fn new(db: SqlitePool, shared_secret: i64, email: EmailClient) -> Self {
        Self {
            db,
            shared_secret,
            email,
        }
    }
}

/// Build application router
///
/// Protected routes sit behind the auth middleware; the health endpoint,
/// public profile, and payment webhook do not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        // Lookup tables
        .route("/api/channels", get(api::channels::list_channels))
        .route("/api/platforms", get(api::channels::list_platforms))
        // Plans (admin)
        .route("/api/plans", get(api::billing::list_plans).post(api::billing::create_plan))
        .route(
            "/api/plans/:plan_id",
            axum::routing::put(api::billing::update_plan).delete(api::billing::delete_plan),
        )
        // Studios (admin)
        .route("/api/studios", get(api::studios::list_studios).post(api::studios::create_studio))
        .route(
            "/api/studios/:studio_id",
            get(api::studios::get_studio)
                .put(api::studios::update_studio)
                .delete(api::studios::delete_studio),
        )
        // Pipeline stages
        .route(
            "/api/studios/:studio_id/stages",
            get(api::stages::list_stages).post(api::stages::create_stage),
        )
        .route("/api/studios/:studio_id/stages/reorder", post(api::stages::reorder_stages))
        .route(
            "/api/studios/:studio_id/stages/:stage_id",
            axum::routing::put(api::stages::update_stage).delete(api::stages::delete_stage),
        )
        // Leads
        .route(
            "/api/studios/:studio_id/leads",
            get(api::leads::list_leads).post(api::leads::create_lead),
        )
        .route("/api/studios/:studio_id/leads/board", get(api::leads::get_board))
        .route(
            "/api/studios/:studio_id/leads/:lead_id",
            get(api::leads::get_lead)
                .put(api::leads::update_lead)
                .delete(api::leads::delete_lead),
        )
        .route("/api/studios/:studio_id/leads/:lead_id/stage", post(api::leads::move_lead))
        // Agents
        .route(
            "/api/studios/:studio_id/agents",
            get(api::agents::list_agents).post(api::agents::create_agent),
        )
        .route(
            "/api/studios/:studio_id/agents/:agent_id",
            get(api::agents::get_agent)
                .put(api::agents::update_agent)
                .delete(api::agents::delete_agent),
        )
        // Catalog
        .route(
            "/api/studios/:studio_id/services",
            get(api::catalog::list_services).post(api::catalog::create_service),
        )
        .route(
            "/api/studios/:studio_id/services/:service_id",
            get(api::catalog::get_service)
                .put(api::catalog::update_service)
                .delete(api::catalog::delete_service),
        )
        .route(
            "/api/studios/:studio_id/packages",
            get(api::catalog::list_packages).post(api::catalog::create_package),
        )
        .route(
            "/api/studios/:studio_id/packages/:package_id",
            get(api::catalog::get_package)
                .put(api::catalog::update_package)
                .delete(api::catalog::delete_package),
        )
        // Expenses and reports
        .route(
            "/api/studios/:studio_id/expenses",
            get(api::expenses::list_expenses).post(api::expenses::create_expense),
        )
        .route(
            "/api/studios/:studio_id/expenses/:expense_id",
            get(api::expenses::get_expense)
                .put(api::expenses::update_expense)
                .delete(api::expenses::delete_expense),
        )
        .route(
            "/api/studios/:studio_id/expenses/:expense_id/pay",
            post(api::expenses::pay_expense),
        )
        .route("/api/studios/:studio_id/reports/expenses", get(api::reports::expense_report))
        .route("/api/studios/:studio_id/reports/funnel", get(api::reports::funnel_report))
        // Subscription
        .route(
            "/api/studios/:studio_id/subscription",
            get(api::billing::get_subscription)
                .put(api::billing::assign_subscription)
                .delete(api::billing::cancel_subscription),
        )
        .layer(middleware::from_fn_with_state(state.clone(), api::auth::auth_middleware));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/profile/:slug", get(api::profile::get_profile))
        .route("/webhooks/payments", post(api::webhooks::payment_event))
        .merge(api::health::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
