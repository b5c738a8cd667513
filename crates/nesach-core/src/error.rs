// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Nesach order backend.

use thiserror::Error;

use crate::order::OrderStatus;

/// The primary error type used across all Nesach crates.
#[derive(Debug, Error)]
pub enum NesachError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Fulfillment dispatch errors (request construction, transport failure).
    #[error("dispatch error: {message}")]
    Dispatch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transactional email errors (transport build, send failure).
    #[error("email error: {message}")]
    Email {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// HTTP server errors (bind failure, serve failure).
    #[error("server error: {message}")]
    Server {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No order exists with the given id (or it belongs to another user).
    #[error("order not found: {id}")]
    OrderNotFound { id: String },

    /// The requested status change is not a legal state-machine transition.
    #[error("invalid order transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Request payload failed domain validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
