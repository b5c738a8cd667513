// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Nesach order backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Nesach configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; secrets default to `None` and their consumers fail closed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NesachConfig {
    /// HTTP server and authentication settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage and document directory settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// External fulfillment bot settings.
    #[serde(default)]
    pub fulfillment: FulfillmentConfig,

    /// Payment gateway webhook settings.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Transactional email (SMTP) settings.
    #[serde(default)]
    pub email: EmailConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer token for client API routes. `None` rejects all requests.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Bearer token for admin routes. `None` rejects all requests.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            api_token: None,
            admin_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8360
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory where fulfillment documents are stored.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            documents_dir: default_documents_dir(),
        }
    }
}

fn default_database_path() -> String {
    "nesach.db".to_string()
}

fn default_documents_dir() -> String {
    "documents".to_string()
}

/// External fulfillment bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FulfillmentConfig {
    /// Fulfillment webhook URL the dispatcher posts paid orders to.
    #[serde(default = "default_fulfillment_endpoint")]
    pub endpoint: String,

    /// Maximum total dispatch attempts per trigger.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff in milliseconds; attempt n waits `base * 2^(n-1)`.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_fulfillment_endpoint(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_fulfillment_endpoint() -> String {
    "http://127.0.0.1:9040/fulfill".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Payment gateway webhook configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Shared secret for webhook HMAC verification. `None` rejects all events.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Base URL of the hosted checkout page; the order id is appended.
    #[serde(default = "default_checkout_base_url")]
    pub checkout_base_url: String,
}

fn default_checkout_base_url() -> String {
    "https://pay.example.com/checkout/".to_string()
}

/// Transactional email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// Enable outbound email. When false, sends become logged no-ops.
    #[serde(default)]
    pub enabled: bool,

    /// SMTP relay hostname.
    #[serde(default)]
    pub smtp_host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,

    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,

    /// Sender address for all outbound mail.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: default_from_address(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "orders@nesach.example".to_string()
}
