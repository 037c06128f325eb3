use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::services::reconciler::{ReconcileOutcome, WebhookReconciler};

pub struct WebhookState {
    pub reconciler: Arc<WebhookReconciler>,
}

/// POST /api/webhooks/payment-links
///
/// Always answers 200 whatever happens internally; gateways retry on
/// non-2xx and a retry storm helps nobody. The real outcome only goes to
/// the logs.
pub async fn handle_payment_link_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: axum::http::HeaderMap,
    body: String,
) -> impl IntoResponse {
    let signature = headers
        .get("x-webhook-signature")
        .and_then(|v| v.to_str().ok());

    let payload: JsonValue = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "webhook payload is not valid JSON");
            return ok_response();
        }
    };

    match state
        .reconciler
        .process(body.as_bytes(), signature, &payload)
        .await
    {
        Ok(ReconcileOutcome::Updated {
            reference_id,
            status,
        }) => {
            info!(reference_id = %reference_id, status = %status, "webhook applied");
        }
        Ok(ReconcileOutcome::IgnoredEventType) => {}
        Ok(outcome) => {
            warn!(outcome = ?outcome, "webhook resolved without update");
        }
        Err(e) => {
            error!(error = %e, "webhook processing failed");
        }
    }

    ok_response()
}

fn ok_response() -> (StatusCode, Json<JsonValue>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "received" })),
    )
}
