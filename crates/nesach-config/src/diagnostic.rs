// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics rendered through miette.
//!
//! Figment deserialization errors are converted into [`ConfigError`] values
//! so startup can report every problem at once instead of failing on the
//! first one.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with enough context for an actionable message.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A TOML file or env var failed to deserialize into the config model.
    #[error("configuration parse error: {message}")]
    #[diagnostic(
        code(nesach::config::parse),
        help("check nesach.toml against the documented [server]/[storage]/[fulfillment]/[payment]/[email] sections")
    )]
    Parse {
        /// The figment error rendered as text (includes the offending key path).
        message: String,
    },

    /// A semantic constraint on a config value was violated.
    #[error("validation error: {message}")]
    #[diagnostic(code(nesach::config::validation))]
    Validation {
        /// Description of the violated constraint.
        message: String,
    },
}

/// Convert a figment error (which may aggregate several failures) into
/// one [`ConfigError`] per underlying failure.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Render all collected errors to stderr as miette reports.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        let report = miette::Report::msg(format!("{error}"));
        eprintln!("{report:?}");
    }
    eprintln!(
        "nesach: {} configuration error(s) -- fix nesach.toml or NESACH_* environment overrides",
        errors.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_message() {
        let err = ConfigError::Validation {
            message: "fulfillment.max_attempts must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn figment_errors_become_parse_errors() {
        let err = figment::Error::from("unexpected key".to_string());
        let converted = figment_to_config_errors(err);
        assert_eq!(converted.len(), 1);
        assert!(matches!(converted[0], ConfigError::Parse { .. }));
    }
}
