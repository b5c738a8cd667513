// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment gateway webhook.
//!
//! Events are authenticated with an HMAC-SHA256 signature over the raw
//! request body (`x-webhook-signature`, lowercase hex). Gateways redeliver:
//! each paid event records its payment id and transitions the order in one
//! transaction, so a replay is acknowledged without re-running any side
//! effects and a delivery that could not apply stays retryable. This is the
//! only code path that moves an order from `pending` to `paid`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use hmac::{Hmac, Mac};
use nesach_core::OrderId;
use nesach_store::queries::orders;
use nesach_store::queries::payment_events::{self, PaidEventOutcome};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::ApiError;
use crate::server::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Incoming webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub order_id: String,
    pub payment_id: String,
}

/// Acknowledgement body returned to the gateway.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// POST /webhooks/payment
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    // No secret configured means no event can be authenticated.
    let Some(ref secret) = state.webhook_secret else {
        tracing::error!("no webhook_secret configured -- rejecting event");
        return Err(ApiError::unauthorized("webhook verification unavailable"));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing webhook signature"))?;

    if !verify_signature(secret, &body, signature) {
        tracing::warn!("webhook signature verification failed");
        return Err(ApiError::unauthorized("invalid webhook signature"));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("malformed webhook body: {e}")))?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        order_id = %event.data.order_id,
        "payment webhook received"
    );

    match event.event_type.as_str() {
        "checkout.completed" | "payment.succeeded" => handle_payment_succeeded(state, event).await,
        "payment.failed" => handle_payment_failed(state, event).await,
        other => {
            tracing::debug!(event_type = %other, "ignoring unrecognized webhook event");
            Ok(Json(WebhookAck { status: "ignored" }))
        }
    }
}

async fn handle_payment_succeeded(
    state: AppState,
    event: WebhookEvent,
) -> Result<Json<WebhookAck>, ApiError> {
    let order_id = OrderId(event.data.order_id.clone());

    // Ledger insert and paid transition commit together: a delivery that
    // does not apply leaves the payment id unrecorded, so a redelivery
    // after a transient failure can still land.
    let outcome = payment_events::record_and_mark_paid(
        &state.db,
        &event.data.payment_id,
        &event.data.order_id,
        &event.event_type,
    )
    .await?;
    match outcome {
        PaidEventOutcome::Applied => {}
        PaidEventOutcome::Duplicate => {
            tracing::info!(payment_id = %event.data.payment_id, "duplicate payment event, skipping");
            return Ok(Json(WebhookAck {
                status: "duplicate",
            }));
        }
        PaidEventOutcome::NotPending => {
            // Unknown order or one no longer pending; acknowledged, not retried.
            tracing::warn!(order_id = %order_id, "payment event for non-pending order");
            return Ok(Json(WebhookAck { status: "ignored" }));
        }
    }

    let Some(order) = orders::get_order(&state.db, &order_id).await? else {
        return Ok(Json(WebhookAck { status: "ignored" }));
    };

    // Notifications never fail the webhook; the payment already stands.
    let confirmation = nesach_email::payment_confirmation(&order);
    if let Err(e) = state.mailer.send(&order.email, &confirmation).await {
        tracing::warn!(order_id = %order.id, error = %e, "payment confirmation email failed");
    }

    // Fulfillment runs in the background so the gateway gets its ack
    // before the retry chain finishes.
    let dispatcher = Arc::clone(&state.dispatcher);
    tokio::spawn(async move {
        match dispatcher.dispatch_order(&order).await {
            Ok(outcome) => {
                tracing::info!(order_id = %order.id, ?outcome, "automatic dispatch finished")
            }
            Err(e) => tracing::error!(order_id = %order.id, error = %e, "automatic dispatch error"),
        }
    });

    Ok(Json(WebhookAck { status: "ok" }))
}

async fn handle_payment_failed(
    state: AppState,
    event: WebhookEvent,
) -> Result<Json<WebhookAck>, ApiError> {
    let order_id = OrderId(event.data.order_id);
    let marked = orders::mark_payment_failed(&state.db, &order_id).await?;
    if marked {
        tracing::info!(order_id = %order_id, "order marked failed after payment failure");
        Ok(Json(WebhookAck { status: "ok" }))
    } else {
        Ok(Json(WebhookAck { status: "ignored" }))
    }
}
