//! Bearer-token gate for write requests.
//!
//! Identity and token issuance live outside this service; the daemon only
//! checks that a write carries the token it was started with.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Expected write token. An unset token disables the check.
#[derive(Clone, Default)]
pub struct WriteToken(Option<String>);

impl std::fmt::Debug for WriteToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(_) => write!(f, "WriteToken([REDACTED])"),
            None => write!(f, "WriteToken(disabled)"),
        }
    }
}

impl WriteToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    /// Check an `Authorization` header value against the token.
    pub fn allows(&self, header: Option<&str>) -> bool {
        let Some(expected) = &self.0 else {
            return true;
        };

        header
            .and_then(bearer_token)
            .map(|provided| constant_time_eq(provided.as_bytes(), expected.as_bytes()))
            .unwrap_or(false)
    }
}

/// Token part of `Bearer <token>`; the scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));

    a.len() == b.len() && diff == 0
}

/// axum middleware rejecting requests without the write token.
pub async fn require_write_token(
    State(token): State<WriteToken>,
    request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !token.allows(header) {
        log::warn!("rejected {} {}: missing or invalid token", request.method(), request.uri());
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized."})),
        )
            .into_response();
    }

    next.run(request).await
}
