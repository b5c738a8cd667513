// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-facing HTTP handlers.
//!
//! Order routes are scoped to the caller identified by the `x-user-id`
//! header. Documents are served read-only from the configured documents
//! directory; names are restricted to a single path component.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use nesach_core::{Order, OrderDraft, OrderId};
use nesach_dispatch::DispatchOutcome;
use nesach_store::queries::orders;
use serde::Serialize;

use crate::error::ApiError;
use crate::server::AppState;

/// Response body for POST /v1/orders.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    /// Hosted checkout page the buyer is redirected to.
    pub checkout_url: String,
}

/// Response body for POST /v1/orders/{id}/dispatch.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub outcome: DispatchOutcome,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub(crate) fn caller_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("missing x-user-id header"))
}

/// GET /health (unauthenticated, for process supervisors).
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /v1/orders
///
/// Validates the draft, persists a pending order, and returns it together
/// with the checkout URL the buyer pays through.
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<OrderDraft>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let user_id = caller_id(&headers)?;
    let order = draft.into_order(&user_id)?;
    orders::create_order(&state.db, &order).await?;

    let checkout_url = format!("{}{}", state.checkout_base_url, order.id);
    tracing::info!(order_id = %order.id, user_id = %user_id, "order created");

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order,
            checkout_url,
        }),
    ))
}

/// GET /v1/orders -- the caller's orders, newest first.
pub async fn list_my_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let user_id = caller_id(&headers)?;
    let list = orders::list_orders_for_user(&state.db, &user_id).await?;
    Ok(Json(list))
}

/// GET /v1/orders/{id}
///
/// Orders belonging to other users are indistinguishable from missing ones.
pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let user_id = caller_id(&headers)?;
    let order = orders::get_order_for_user(&state.db, &OrderId(id.clone()), &user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("order not found: {id}")))?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/dispatch -- manual fulfillment re-trigger.
///
/// Same dispatch path as the automatic post-payment trigger, so the retry
/// chain restarts from attempt zero.
pub async fn trigger_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let order = orders::get_order_for_user(&state.db, &OrderId(id.clone()), &user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("order not found: {id}")))?;

    let outcome = state.dispatcher.dispatch_order(&order).await?;
    Ok(Json(DispatchResponse { outcome }))
}

/// GET /documents/{name} -- serve a stored fulfillment document.
pub async fn get_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    // Single path component only; no traversal out of the documents dir.
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ApiError::bad_request("invalid document name"));
    }

    let path = state.documents_dir.join(&name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("document not found: {name}")))?;

    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
