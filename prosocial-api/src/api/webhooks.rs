//! Payment processor webhook
//!
//! The processor posts events referencing the `external_ref` we handed it
//! at checkout. Completion activates the subscription; failure marks it
//! past due. Unknown event types are acknowledged and ignored so the
//! processor does not retry them forever.

use axum::{extract::State, http::StatusCode, Json};
use prosocial_common::db::billing;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ApiError;
use crate::AppState;

/// Incoming processor event
#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    pub event_type: String,
    pub external_ref: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
}

/// POST /webhooks/payments
pub async fn payment_event(
    State(state): State<AppState>,
    Json(event): Json<PaymentEvent>,
) -> Result<(StatusCode, Json<WebhookResponse>), ApiError> {
    match event.event_type.as_str() {
        "payment.completed" => {
            let payment = billing::complete_payment(&state.db, &event.external_ref).await?;
            info!(
                "Payment {} completed ({} cents)",
                payment.external_ref, payment.amount_cents
            );
            Ok((
                StatusCode::OK,
                Json(WebhookResponse {
                    status: "processed".to_string(),
                }),
            ))
        }
        "payment.failed" => {
            let payment = billing::fail_payment(&state.db, &event.external_ref).await?;
            info!("Payment {} failed", payment.external_ref);
            Ok((
                StatusCode::OK,
                Json(WebhookResponse {
                    status: "processed".to_string(),
                }),
            ))
        }
        other => {
            warn!("Ignoring unknown payment event type: {}", other);
            Ok((
                StatusCode::OK,
                Json(WebhookResponse {
                    status: "ignored".to_string(),
                }),
            ))
        }
    }
}
