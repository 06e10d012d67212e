//! Pool diagnostics: `/api/keys-status`, `/api/health`, `/api/debug/next-key`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use key_pool::Dispatcher;

use crate::error::ApiError;

/// Usage, failures and cursor position per key. Read-only.
pub async fn keys_status(dispatcher: &Dispatcher) -> Response {
    axum::Json(dispatcher.pool().status().await).into_response()
}

/// Upstream reachability with the current key. 200 when reachable, 503 otherwise.
pub async fn health(dispatcher: &Dispatcher) -> Response {
    let report = dispatcher.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, axum::Json(report)).into_response()
}

/// Hand out the current key's identity and advance, counting it as a use.
/// Only mounted with `server.debug_routes`.
pub async fn next_key(dispatcher: &Dispatcher) -> Response {
    match dispatcher.pool().take_next().await {
        Ok(peeked) => axum::Json(peeked).into_response(),
        Err(e) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}
