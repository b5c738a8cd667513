// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and retry
//! bounds. Collects every violation instead of failing fast.

use crate::diagnostic::ConfigError;
use crate::model::NesachConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &NesachConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.documents_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.documents_dir must not be empty".to_string(),
        });
    }

    let endpoint = config.fulfillment.endpoint.trim();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("fulfillment.endpoint `{endpoint}` must be an http(s) URL"),
        });
    }

    if config.fulfillment.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "fulfillment.max_attempts must be at least 1, got {}",
                config.fulfillment.max_attempts
            ),
        });
    }

    if config.fulfillment.base_backoff_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "fulfillment.base_backoff_ms must be greater than 0".to_string(),
        });
    }

    if config.email.enabled {
        if config.email.smtp_host.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "email.smtp_host is required when email.enabled = true".to_string(),
            });
        }
        if config.email.from_address.trim().is_empty() || !config.email.from_address.contains('@') {
            errors.push(ConfigError::Validation {
                message: format!(
                    "email.from_address `{}` is not a valid sender address",
                    config.email.from_address
                ),
            });
        }
    }

    if let Some(secret) = &config.payment.webhook_secret
        && secret.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "payment.webhook_secret must not be blank when set".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
