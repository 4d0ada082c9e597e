//! Integration tests for the ProSocial API endpoints
//!
//! Tests run against a real router with a temp SQLite database and
//! authentication disabled (shared_secret = 0), except where auth itself is
//! under test. Endpoint behavior covered: studio provisioning, stage
//! reordering, lead lifecycle and double-submit, catalog price coercion and
//! referential protection, expense reports, billing webhooks, and the
//! public profile.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower::util::ServiceExt; // for `oneshot`

use prosocial_api::{build_router, email::EmailClient, AppState};
use prosocial_common::db::init::init_database;

struct TestApp {
    app: axum::Router,
    pool: SqlitePool,
    path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Test helper: temp database + router with auth disabled
async fn setup(tag: &str) -> TestApp {
    let path = PathBuf::from(format!(
        "/tmp/prosocial-api-test-{}-{}.db",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let pool = init_database(&path).await.expect("init database");
    let state = AppState::new(pool.clone(), 0, EmailClient::disabled());
    let app = build_router(state);

    TestApp { app, pool, path }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON body")
    };
    (status, body)
}

/// Create a studio and return its guid
async fn make_studio(app: &axum::Router, slug: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/studios",
            json!({ "name": "Test Studio", "slug": slug, "email": "owner@studio.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create studio failed: {}", body);
    body["guid"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and auth
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let t = setup("health").await;

    let (status, body) = send(&t.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "prosocial-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_route_rejects_missing_auth() {
    let t = setup("auth").await;

    // Rebuild the router with a real secret; the GET has no auth params
    let state = AppState::new(t.pool.clone(), 12345, EmailClient::disabled());
    let app = build_router(state);

    let (status, _) = send(&app, get("/api/channels")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Health stays open
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Studios and stages
// =============================================================================

#[tokio::test]
async fn test_create_studio_seeds_default_stages() {
    let t = setup("studio-seed").await;
    let studio_id = make_studio(&t.app, "studio-seed").await;

    let (status, body) = send(&t.app, get(&format!("/api/studios/{}/stages", studio_id))).await;

    assert_eq!(status, StatusCode::OK);
    let stages = body["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 5);
    assert_eq!(stages[0]["name"], "New");
    assert_eq!(stages[0]["position"], 0);
    assert_eq!(stages[4]["position"], 4);
}

#[tokio::test]
async fn test_create_studio_rejects_bad_slug() {
    let t = setup("studio-slug").await;

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/studios",
            json!({ "name": "Bad Slug", "slug": "Not A Slug" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["slug"].is_string());
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let t = setup("studio-dup").await;
    make_studio(&t.app, "taken").await;

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/api/studios",
            json!({ "name": "Second", "slug": "taken" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_stage_reorder_round_trip() {
    let t = setup("reorder").await;
    let studio_id = make_studio(&t.app, "reorder").await;

    let (_, body) = send(&t.app, get(&format!("/api/studios/{}/stages", studio_id))).await;
    let stages = body["stages"].as_array().unwrap();
    let count = stages.len();

    // Reverse the order
    let moves: Vec<Value> = stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            json!({ "stage_id": stage["guid"], "position": count - 1 - index })
        })
        .collect();

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/stages/reorder", studio_id),
            json!({ "stages": moves }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "reorder failed: {}", body);
    let reordered = body["stages"].as_array().unwrap();
    assert_eq!(reordered.len(), count);
    assert_eq!(reordered[0]["guid"], stages[count - 1]["guid"]);
    for (index, stage) in reordered.iter().enumerate() {
        assert_eq!(stage["position"], index as i64);
    }
}

#[tokio::test]
async fn test_stage_reorder_rejects_duplicate_positions() {
    let t = setup("reorder-bad").await;
    let studio_id = make_studio(&t.app, "reorder-bad").await;

    let (_, body) = send(&t.app, get(&format!("/api/studios/{}/stages", studio_id))).await;
    let stages = body["stages"].as_array().unwrap();

    // All stages claim position 0
    let moves: Vec<Value> = stages
        .iter()
        .map(|stage| json!({ "stage_id": stage["guid"], "position": 0 }))
        .collect();

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/stages/reorder", studio_id),
            json!({ "stages": moves }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_studio_is_404() {
    let t = setup("no-studio").await;

    let (status, _) = send(&t.app, get("/api/studios/nope/stages")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, get("/api/studios/nope/leads")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Leads
// =============================================================================

#[tokio::test]
async fn test_create_lead_and_validation() {
    let t = setup("lead-create").await;
    let studio_id = make_studio(&t.app, "lead-create").await;

    // Missing name rejected with a field message
    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads", studio_id),
            json!({ "name": "   ", "email": "bad" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["name"].is_string());
    assert!(body["fields"]["email"].is_string());

    // Valid lead lands in the first stage
    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads", studio_id),
            json!({ "name": "Ana Souza", "email": "ana@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Ana Souza");

    let (_, stages_body) = send(&t.app, get(&format!("/api/studios/{}/stages", studio_id))).await;
    let first_stage = &stages_body["stages"][0];
    assert_eq!(body["stage_id"], first_stage["guid"]);
}

#[tokio::test]
async fn test_lead_double_submit_returns_existing() {
    let t = setup("lead-dup").await;
    let studio_id = make_studio(&t.app, "lead-dup").await;

    let payload = json!({ "name": "Ana", "request_key": "submit-1" });

    let (status, first) = send(
        &t.app,
        json_request("POST", &format!("/api/studios/{}/leads", studio_id), payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = send(
        &t.app,
        json_request("POST", &format!("/api/studios/{}/leads", studio_id), payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["guid"], second["guid"]);

    let (_, list) = send(&t.app, get(&format!("/api/studios/{}/leads", studio_id))).await;
    assert_eq!(list["leads"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_move_lead_endpoint() {
    let t = setup("lead-move").await;
    let studio_id = make_studio(&t.app, "lead-move").await;

    let (_, lead) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads", studio_id),
            json!({ "name": "Ana" }),
        ),
    )
    .await;
    let lead_id = lead["guid"].as_str().unwrap();

    let (_, stages_body) = send(&t.app, get(&format!("/api/studios/{}/stages", studio_id))).await;
    let target = stages_body["stages"][2]["guid"].as_str().unwrap().to_string();

    let (status, moved) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads/{}/stage", studio_id, lead_id),
            json!({ "stage_id": target }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["stage_id"], Value::String(target.clone()));

    // Unknown stage is a 404, lead unchanged
    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads/{}/stage", studio_id, lead_id),
            json!({ "stage_id": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, lead_after) = send(
        &t.app,
        get(&format!("/api/studios/{}/leads/{}", studio_id, lead_id)),
    )
    .await;
    assert_eq!(lead_after["stage_id"], Value::String(target));
}

#[tokio::test]
async fn test_board_endpoint_groups_by_stage() {
    let t = setup("board").await;
    let studio_id = make_studio(&t.app, "board").await;

    send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads", studio_id),
            json!({ "name": "Ana" }),
        ),
    )
    .await;

    let (status, body) = send(&t.app, get(&format!("/api/studios/{}/leads/board", studio_id))).await;

    assert_eq!(status, StatusCode::OK);
    let columns = body["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 5);
    assert_eq!(columns[0]["leads"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_service_price_coercion() {
    let t = setup("service-price").await;
    let studio_id = make_studio(&t.app, "service-price").await;

    // Non-numeric price rejected
    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/services", studio_id),
            json!({ "name": "Album", "price": "abc" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["price"].is_string());

    // Negative price rejected
    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/services", studio_id),
            json!({ "name": "Album", "price": "-10" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Valid price stored as parsed cents
    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/services", studio_id),
            json!({ "name": "Album", "price": "1234.56" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["price_cents"], 123456);
}

#[tokio::test]
async fn test_package_composition_and_service_protection() {
    let t = setup("package").await;
    let studio_id = make_studio(&t.app, "package").await;

    let (_, service) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/services", studio_id),
            json!({ "name": "Coverage", "price": "800" }),
        ),
    )
    .await;
    let service_id = service["guid"].as_str().unwrap().to_string();

    // Unknown service in the bundle is a validation failure
    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/packages", studio_id),
            json!({
                "name": "Wedding",
                "price": "4990,00",
                "services": [{ "service_id": "nope" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Valid package aggregates the service
    let (status, package) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/packages", studio_id),
            json!({
                "name": "Wedding",
                "event_type": "wedding",
                "price": "4990,00",
                "services": [{ "service_id": service_id, "quantity": 2 }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create package failed: {}", package);
    assert_eq!(package["price_cents"], 499000);
    assert_eq!(package["services"][0]["quantity"], 2);

    // The referenced service cannot be deleted
    let (status, _) = send(
        &t.app,
        delete(&format!("/api/studios/{}/services/{}", studio_id, service_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Dropping the package frees the service
    let package_id = package["guid"].as_str().unwrap();
    let (status, _) = send(
        &t.app,
        delete(&format!("/api/studios/{}/packages/{}", studio_id, package_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &t.app,
        delete(&format!("/api/studios/{}/services/{}", studio_id, service_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// =============================================================================
// Expenses and reports
// =============================================================================

#[tokio::test]
async fn test_expense_lifecycle_and_report() {
    let t = setup("expenses").await;
    let studio_id = make_studio(&t.app, "expenses").await;

    let (status, expense) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/expenses", studio_id),
            json!({
                "description": "Studio rent",
                "category": "rent",
                "amount": "1500.00",
                "due_date": "2026-03-05"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["status"], "pending");
    assert_eq!(expense["amount_cents"], 150000);

    // Pay it
    let expense_id = expense["guid"].as_str().unwrap();
    let (status, paid) = send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/expenses/{}/pay", studio_id, expense_id),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert!(paid["paid_at"].is_string());

    // Second expense stays pending
    send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/expenses", studio_id),
            json!({
                "description": "Lens repair",
                "category": "equipment",
                "amount": "350,50",
                "due_date": "2026-03-20"
            }),
        ),
    )
    .await;

    let (status, report) = send(
        &t.app,
        get(&format!("/api/studios/{}/reports/expenses?year=2026", studio_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["year"], 2026);
    assert_eq!(report["total_paid_cents"], 150000);
    assert_eq!(report["total_pending_cents"], 35050);

    // March carries both totals
    let march = &report["months"][2];
    assert_eq!(march["month"], 3);
    assert_eq!(march["paid_cents"], 150000);
    assert_eq!(march["pending_cents"], 35050);

    let categories = report["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
}

#[tokio::test]
async fn test_funnel_report_counts_leads() {
    let t = setup("funnel").await;
    let studio_id = make_studio(&t.app, "funnel").await;

    send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads", studio_id),
            json!({ "name": "Ana" }),
        ),
    )
    .await;
    send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/leads", studio_id),
            json!({ "name": "Bruno" }),
        ),
    )
    .await;

    let (status, report) = send(
        &t.app,
        get(&format!("/api/studios/{}/reports/funnel", studio_id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let stages = report["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 5);
    assert_eq!(stages[0]["lead_count"], 2);
    assert_eq!(stages[1]["lead_count"], 0);
}

// =============================================================================
// Billing and webhooks
// =============================================================================

#[tokio::test]
async fn test_subscription_flow_with_payment_webhook() {
    let t = setup("billing").await;
    let studio_id = make_studio(&t.app, "billing").await;

    let (status, plan) = send(
        &t.app,
        json_request(
            "POST",
            "/api/plans",
            json!({ "name": "Pro", "price": "199.90", "billing_interval": "monthly" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let plan_id = plan["guid"].as_str().unwrap();

    // Assign the plan: trialing subscription + pending payment
    let (status, assigned) = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/studios/{}/subscription", studio_id),
            json!({ "plan_id": plan_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "assign failed: {}", assigned);
    assert_eq!(assigned["subscription"]["status"], "trialing");
    assert_eq!(assigned["payment"]["status"], "pending");
    assert_eq!(assigned["payment"]["amount_cents"], 19990);

    let external_ref = assigned["payment"]["external_ref"].as_str().unwrap();

    // Completed payment activates the subscription
    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/webhooks/payments",
            json!({ "event_type": "payment.completed", "external_ref": external_ref }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processed");

    let (status, detail) = send(
        &t.app,
        get(&format!("/api/studios/{}/subscription", studio_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["subscription"]["status"], "active");
    assert!(detail["subscription"]["current_period_end"].is_string());
    assert_eq!(detail["plan"]["name"], "Pro");

    // Repeated delivery is a no-op
    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/webhooks/payments",
            json!({ "event_type": "payment.completed", "external_ref": external_ref }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Cancel
    let (status, _) = send(
        &t.app,
        delete(&format!("/api/studios/{}/subscription", studio_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &t.app,
        get(&format!("/api/studios/{}/subscription", studio_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_unknown_ref_and_event() {
    let t = setup("webhook-unknown").await;

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/webhooks/payments",
            json!({ "event_type": "payment.completed", "external_ref": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/webhooks/payments",
            json!({ "event_type": "invoice.created", "external_ref": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn test_failed_payment_marks_past_due() {
    let t = setup("webhook-failed").await;
    let studio_id = make_studio(&t.app, "webhook-failed").await;

    let (_, plan) = send(
        &t.app,
        json_request(
            "POST",
            "/api/plans",
            json!({ "name": "Starter", "price": "99" }),
        ),
    )
    .await;

    let (_, assigned) = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/studios/{}/subscription", studio_id),
            json!({ "plan_id": plan["guid"] }),
        ),
    )
    .await;
    let external_ref = assigned["payment"]["external_ref"].as_str().unwrap();

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/webhooks/payments",
            json!({ "event_type": "payment.failed", "external_ref": external_ref }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = send(
        &t.app,
        get(&format!("/api/studios/{}/subscription", studio_id)),
    )
    .await;
    assert_eq!(detail["subscription"]["status"], "past_due");
}

// =============================================================================
// Public profile
// =============================================================================

#[tokio::test]
async fn test_profile_shows_only_visible_catalog() {
    let t = setup("profile").await;
    let studio_id = make_studio(&t.app, "profile").await;

    send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/services", studio_id),
            json!({ "name": "Public Service", "price": "100" }),
        ),
    )
    .await;
    send(
        &t.app,
        json_request(
            "POST",
            &format!("/api/studios/{}/services", studio_id),
            json!({ "name": "Hidden Service", "price": "100", "visible": false }),
        ),
    )
    .await;

    let (status, profile) = send(&t.app, get("/api/profile/profile")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Test Studio");
    let services = profile["services"].as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["name"], "Public Service");

    // Unknown slug is a 404
    let (status, _) = send(&t.app, get("/api/profile/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Lookups
// =============================================================================

#[tokio::test]
async fn test_lookup_endpoints_return_seeded_entries() {
    let t = setup("lookups").await;

    let (status, body) = send(&t.app, get("/api/channels")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["channels"].as_array().unwrap().len() >= 5);

    let (status, body) = send(&t.app, get("/api/platforms")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["platforms"].as_array().unwrap().len() >= 3);
}
