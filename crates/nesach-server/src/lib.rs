// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for the Nesach order backend.
//!
//! Exposes order creation and lookup for storefront clients, the signed
//! payment webhook, document downloads, and the admin surface for manual
//! fulfillment.

pub mod admin;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod webhook;

pub use auth::AuthConfig;
pub use error::{ApiError, ErrorResponse};
pub use server::{build_router, start_server, AppState, BindConfig};
