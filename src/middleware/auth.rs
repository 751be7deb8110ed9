use axum::{
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::AppState;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

fn provided_secret(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(v.trim().to_string());
    }

    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim().to_string())
    } else {
        None
    }
}

// constant-time over equal-length inputs
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Guards scheduler endpoints. An unset secret rejects everything.
pub async fn require_cron_secret(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let expected = state.settings.cron_secret.trim();

    let authorized = !expected.is_empty()
        && provided_secret(req.headers())
            .map(|p| secrets_match(&p, expected))
            .unwrap_or(false);

    if !authorized {
        tracing::warn!(path = %req.uri().path(), "rejected scheduler call without valid secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error": "unauthorized" })),
        )
            .into_response();
    }

    next.run(req).await
}
