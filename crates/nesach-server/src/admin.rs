// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin handlers.
//!
//! Operators see every order, attach fulfillment documents by hand when the
//! bot fails, and close abandoned checkouts. Document upload doubles as the
//! bot's callback, so it is idempotent: the first attach wins and later
//! uploads get the original URL back.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use nesach_core::{Order, OrderId};
use nesach_store::queries::orders;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::AppState;

/// Request body for POST /v1/admin/orders/{id}/document.
#[derive(Debug, Deserialize)]
pub struct UploadDocumentRequest {
    /// Original filename; only its extension is kept.
    pub filename: String,
    /// Document bytes, standard base64.
    pub content_base64: String,
}

/// Response body for POST /v1/admin/orders/{id}/document.
#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    /// Public path the document is served from.
    pub document_url: String,
    /// False when the order already had a document and this upload was a no-op.
    pub newly_attached: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub status: &'static str,
}

/// GET /v1/admin/orders -- every order, newest first.
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    let list = orders::list_all_orders(&state.db).await?;
    Ok(Json(list))
}

/// POST /v1/admin/orders/{id}/document
///
/// Stores the decoded document under the documents directory as
/// `{order_id}.{ext}` and attaches its URL to the order. The first attach
/// moves a paid order to `sent` and sends the document-ready email; replays
/// return the already-attached URL unchanged.
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UploadDocumentRequest>,
) -> Result<(StatusCode, Json<UploadDocumentResponse>), ApiError> {
    let order_id = OrderId(id.clone());

    // The file is publicly served once written; confirm the order exists
    // before anything lands on disk.
    if orders::get_order(&state.db, &order_id).await?.is_none() {
        return Err(ApiError::not_found(format!("order not found: {id}")));
    }

    let extension = std::path::Path::new(&request.filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("pdf");
    let file_name = format!("{id}.{extension}");

    let content = BASE64
        .decode(request.content_base64.as_bytes())
        .map_err(|e| ApiError::bad_request(format!("invalid base64 content: {e}")))?;
    if content.is_empty() {
        return Err(ApiError::bad_request("document content is empty"));
    }

    tokio::fs::create_dir_all(&state.documents_dir)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to create documents directory");
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "internal error".to_string(),
            }
        })?;
    let path = state.documents_dir.join(&file_name);
    tokio::fs::write(&path, &content).await.map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "failed to write document");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    })?;

    let url = format!("/documents/{file_name}");
    let outcome = orders::attach_document(&state.db, &order_id, &url)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("order not found: {id}")))?;

    if outcome.newly_attached {
        tracing::info!(order_id = %id, url = %outcome.document_url, "document attached");
        if let Some(order) = orders::get_order(&state.db, &order_id).await? {
            let notice = nesach_email::document_ready(&order, &outcome.document_url);
            if let Err(e) = state.mailer.send(&order.email, &notice).await {
                tracing::warn!(order_id = %id, error = %e, "document-ready email failed");
            }
        }
    }

    Ok((
        StatusCode::OK,
        Json(UploadDocumentResponse {
            document_url: outcome.document_url,
            newly_attached: outcome.newly_attached,
        }),
    ))
}

/// POST /v1/admin/orders/{id}/cancel -- close an abandoned checkout.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let cancelled = orders::mark_cancelled(&state.db, &OrderId(id.clone())).await?;
    if cancelled {
        tracing::info!(order_id = %id, "order cancelled");
        Ok(Json(CancelResponse {
            status: "cancelled",
        }))
    } else {
        Err(ApiError::conflict(
            "only pending orders can be cancelled",
        ))
    }
}
