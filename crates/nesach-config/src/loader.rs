// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./nesach.toml` > `~/.config/nesach/nesach.toml` > `/etc/nesach/nesach.toml`
//! with environment variable overrides via `NESACH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::NesachConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/nesach/nesach.toml` (system-wide)
/// 3. `~/.config/nesach/nesach.toml` (user XDG config)
/// 4. `./nesach.toml` (local directory)
/// 5. `NESACH_*` environment variables
pub fn load_config() -> Result<NesachConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NesachConfig::default()))
        .merge(Toml::file("/etc/nesach/nesach.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("nesach/nesach.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("nesach.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<NesachConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NesachConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NesachConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NesachConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `NESACH_PAYMENT_WEBHOOK_SECRET`
/// must map to `payment.webhook_secret`, not `payment.webhook.secret`.
fn env_provider() -> Env {
    Env::prefixed("NESACH_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: NESACH_FULFILLMENT_BASE_BACKOFF_MS -> "fulfillment_base_backoff_ms"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("fulfillment_", "fulfillment.", 1)
            .replacen("payment_", "payment.", 1)
            .replacen("email_", "email.", 1);
        mapped.into()
    })
}
