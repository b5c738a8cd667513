// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Three route groups: unauthenticated public routes (health, document
//! downloads, the signed payment webhook), client order routes behind the
//! API token, and admin routes behind the admin token.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use nesach_core::NesachError;
use nesach_dispatch::Dispatcher;
use nesach_email::Mailer;
use nesach_store::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthConfig};
use crate::{admin, handlers, webhook};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Order storage.
    pub db: Database,
    /// Shared fulfillment dispatcher (automatic and manual triggers).
    pub dispatcher: Arc<Dispatcher>,
    /// Outbound transactional mail.
    pub mailer: Arc<dyn Mailer>,
    /// Bearer tokens for the client and admin route groups.
    pub auth: AuthConfig,
    /// Directory fulfillment documents are stored in and served from.
    pub documents_dir: PathBuf,
    /// Base URL of the hosted checkout page; the order id is appended.
    pub checkout_base_url: String,
    /// Shared secret for webhook HMAC verification.
    pub webhook_secret: Option<String>,
}

/// Server bind configuration (mirrors ServerConfig from nesach-config).
#[derive(Debug, Clone)]
pub struct BindConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    // Health and documents need no auth; the webhook authenticates itself
    // via the body signature.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/documents/{name}", get(handlers::get_document))
        .route("/webhooks/payment", post(webhook::payment_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/orders",
            post(handlers::create_order).get(handlers::list_my_orders),
        )
        .route("/v1/orders/{id}", get(handlers::get_order))
        .route("/v1/orders/{id}/dispatch", post(handlers::trigger_dispatch))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_api_token,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/v1/admin/orders", get(admin::list_orders))
        .route("/v1/admin/orders/{id}/document", post(admin::upload_document))
        .route("/v1/admin/orders/{id}/cancel", post(admin::cancel_order))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_admin_token,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn start_server(config: &BindConfig, state: AppState) -> Result<(), NesachError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| NesachError::Server {
            message: format!("failed to bind to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("API server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| NesachError::Server {
            message: format!("server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
