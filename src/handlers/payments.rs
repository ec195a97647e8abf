use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::{client_ip, enforce_rate_limit, parse_json};
use crate::errors::{AppError, AppResult};
use crate::models::CreateCheckoutRequest;
use crate::services::payments::{self, webhook, CompletedCheckout, WebhookEvent};
use crate::state::AppState;

// POST /api/payments/create-checkout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateCheckoutRequest>, JsonRejection>,
) -> AppResult<Json<CheckoutResponse>> {
    enforce_rate_limit(&state, &format!("checkout:{}", client_ip(&headers))).await?;
    let input = parse_json(payload)?;
    let request = payments::build_checkout(&state.config, &input)?;

    let session = state
        .payments
        .create_checkout_session(&request)
        .await
        .map_err(|e| AppError::Internal(format!("checkout session failed: {e:#}")))?;

    tracing::info!(session_id = %session.id, package_id = %request.package_id, "checkout session created");
    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

// POST /api/payments/webhook
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".to_string()))?;

    if let Err(e) = webhook::verify_signature(
        &state.config.stripe_webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %e, "webhook signature verification failed");
        return Err(AppError::InvalidSignature);
    }

    let event: WebhookEvent = serde_json::from_str(&body)
        .map_err(|_| AppError::BadRequest("Invalid event payload".to_string()))?;

    match event.kind.as_str() {
        "checkout.session.completed" => {
            let session: CompletedCheckout = serde_json::from_value(event.data.object)
                .map_err(|_| AppError::BadRequest("Invalid checkout session".to_string()))?;
            let recorded = {
                let conn = state.conn()?;
                payments::record_paid_checkout(&conn, &state.config.brand_id, &session)
            };
            match recorded {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::error!(session_id = %session.id, "paid checkout was not stored");
                }
                Err(e) => {
                    tracing::error!(session_id = %session.id, error = %e, "could not record paid checkout");
                }
            }
        }
        "payment_intent.payment_failed" => {
            let object = &event.data.object;
            tracing::warn!(
                payment_intent = object["id"].as_str().unwrap_or_default(),
                reason = object["last_payment_error"]["message"].as_str().unwrap_or_default(),
                "payment failed"
            );
        }
        other => tracing::debug!(event_type = other, "ignoring webhook event"),
    }

    Ok(Json(json!({ "received": true })))
}
