// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication middleware.
//!
//! Client and admin routes carry separate tokens. When a token is not
//! configured, its routes reject all requests (fail-closed). The caller's
//! identity for order ownership comes from the `x-user-id` header, supplied
//! by the storefront that holds the API token.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// Authentication configuration for the API server.
#[derive(Clone)]
pub struct AuthConfig {
    /// Bearer token for client routes. `None` rejects all requests.
    pub api_token: Option<String>,
    /// Bearer token for admin routes. `None` rejects all requests.
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

fn bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Middleware guarding the client API routes.
pub async fn require_api_token(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(ref expected) = auth.api_token else {
        tracing::error!("no api_token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };
    match bearer(&request) {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Middleware guarding the admin routes.
pub async fn require_admin_token(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(ref expected) = auth.admin_token else {
        tracing::error!("no admin_token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };
    match bearer(&request) {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_tokens() {
        let config = AuthConfig {
            api_token: Some("client-secret".to_string()),
            admin_token: Some("admin-secret".to_string()),
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("client-secret"));
        assert!(!debug_output.contains("admin-secret"));
        assert!(debug_output.contains("[redacted]"));
    }

    #[test]
    fn bearer_extraction() {
        let request = Request::builder()
            .header("authorization", "Bearer tok-1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer(&request), Some("tok-1"));

        let request = Request::builder()
            .header("authorization", "Basic dXNlcg==")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer(&request), None);
    }
}
