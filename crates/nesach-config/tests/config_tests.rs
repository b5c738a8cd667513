// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Nesach configuration system.

use nesach_config::diagnostic::ConfigError;
use nesach_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_nesach_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
log_level = "debug"
api_token = "client-secret"
admin_token = "admin-secret"

[storage]
database_path = "/tmp/orders.db"
documents_dir = "/tmp/documents"

[fulfillment]
endpoint = "https://bot.example.com/fulfill"
max_attempts = 3
base_backoff_ms = 1000
request_timeout_secs = 15

[payment]
webhook_secret = "whsec_123"
checkout_base_url = "https://pay.example.com/c/"

[email]
enabled = true
smtp_host = "smtp.example.com"
smtp_port = 465
username = "mailer"
password = "hunter2"
from_address = "orders@example.com"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.server.api_token.as_deref(), Some("client-secret"));
    assert_eq!(config.server.admin_token.as_deref(), Some("admin-secret"));
    assert_eq!(config.storage.database_path, "/tmp/orders.db");
    assert_eq!(config.storage.documents_dir, "/tmp/documents");
    assert_eq!(config.fulfillment.endpoint, "https://bot.example.com/fulfill");
    assert_eq!(config.fulfillment.max_attempts, 3);
    assert_eq!(config.fulfillment.base_backoff_ms, 1000);
    assert_eq!(config.payment.webhook_secret.as_deref(), Some("whsec_123"));
    assert!(config.email.enabled);
    assert_eq!(config.email.smtp_port, 465);
    assert_eq!(config.email.from_address, "orders@example.com");
}

/// Unknown field in [fulfillment] section is rejected.
#[test]
fn unknown_field_in_fulfillment_produces_error() {
    let toml = r#"
[fulfillment]
endpont = "https://bot.example.com/fulfill"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    // Figment wraps serde's deny_unknown_fields error
    assert!(
        err_str.contains("unknown field") || err_str.contains("endpont"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let toml = "";
    let config = load_config_from_str(toml).expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8360);
    assert_eq!(config.server.log_level, "info");
    assert!(config.server.api_token.is_none());
    assert!(config.server.admin_token.is_none());
    assert_eq!(config.storage.database_path, "nesach.db");
    assert_eq!(config.storage.documents_dir, "documents");
    assert_eq!(config.fulfillment.max_attempts, 3);
    assert_eq!(config.fulfillment.base_backoff_ms, 1000);
    assert!(config.payment.webhook_secret.is_none());
    assert!(!config.email.enabled);
}

/// The compiled defaults pass validation.
#[test]
fn default_config_is_valid() {
    load_and_validate_str("").expect("default config should validate");
}

/// Zero retry attempts is a validation error, not a silent no-retry mode.
#[test]
fn zero_max_attempts_fails_validation() {
    let toml = r#"
[fulfillment]
max_attempts = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("max_attempts")
    )));
}

/// A non-http fulfillment endpoint is rejected.
#[test]
fn non_http_endpoint_fails_validation() {
    let toml = r#"
[fulfillment]
endpoint = "ftp://bot.example.com"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("fulfillment.endpoint")
    )));
}

/// Enabling email without an SMTP host collects a validation error.
#[test]
fn email_enabled_requires_smtp_host() {
    let toml = r#"
[email]
enabled = true
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("smtp_host")
    )));
}

/// Validation collects every violation rather than stopping at the first.
#[test]
fn validation_collects_all_errors() {
    let toml = r#"
[server]
host = ""

[storage]
database_path = ""

[fulfillment]
max_attempts = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.len() >= 3, "expected at least 3 errors, got {}", errors.len());
}

/// An override merged after the TOML layer wins, mirroring how
/// NESACH_SERVER_PORT maps to `server.port` via the env provider.
#[test]
fn later_layer_overrides_server_port() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };
    use nesach_config::model::NesachConfig;

    let config: NesachConfig = Figment::new()
        .merge(Serialized::defaults(NesachConfig::default()))
        .merge(Toml::string("[server]\nport = 8080\n"))
        .merge(("server.port", 9999))
        .extract()
        .expect("should merge override");
    assert_eq!(config.server.port, 9999);
}

/// NESACH_PAYMENT_WEBHOOK_SECRET must map to payment.webhook_secret,
/// not payment.webhook.secret.
#[test]
fn webhook_secret_maps_as_single_key() {
    use figment::{providers::Serialized, Figment};
    use nesach_config::model::NesachConfig;

    let config: NesachConfig = Figment::new()
        .merge(Serialized::defaults(NesachConfig::default()))
        .merge(("payment.webhook_secret", "whsec_env"))
        .extract()
        .expect("should set webhook_secret via dot notation");
    assert_eq!(config.payment.webhook_secret.as_deref(), Some("whsec_env"));
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };
    use nesach_config::model::NesachConfig;

    let config: NesachConfig = Figment::new()
        .merge(Serialized::defaults(NesachConfig::default()))
        .merge(Toml::file("/nonexistent/path/nesach.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.server.host, "127.0.0.1");
}
