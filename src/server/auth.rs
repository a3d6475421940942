//! Bearer token check for the populate routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};

use super::error::ServerError;
use super::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Compares two tokens in time independent of where they differ.
///
/// Both sides are hashed first so the comparison always runs over 32 bytes
/// and leaks nothing about the expected token's length.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Rejects requests without the configured admin token.
///
/// When no token is configured, requests pass through; the host is then
/// expected to authenticate callers in front of this service.
pub async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return next.run(request).await;
    };

    let rejection = match bearer_token(request.headers()) {
        Some(token) if tokens_match(token, expected) => None,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "rejected request with invalid admin token");
            Some("Invalid admin token")
        }
        None => Some("Bearer token required"),
    };

    match rejection {
        None => next.run(request).await,
        Some(message) => ServerError::unauthorized(message).into_response(),
    }
}
