//! `POST /api/groq-proxy`
//!
//! Decodes the caller's JSON, hands it to the dispatcher and returns the
//! upstream completion body byte for byte.

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use key_pool::Dispatcher;
use tracing::{info, instrument, warn};

use crate::error::ApiError;

#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn relay_chat(dispatcher: &Dispatcher, body: Bytes, request_id: String) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "chat request body is not valid JSON");
            return ApiError::bad_request(format!("body must be JSON: {e}")).into_response();
        }
    };

    match dispatcher.dispatch_json(&payload).await {
        Ok(done) => {
            info!(
                key_index = done.key_index,
                attempts = done.attempts,
                bytes = done.reply.body.len(),
                "chat request served"
            );
            let status = StatusCode::from_u16(done.reply.status).unwrap_or(StatusCode::OK);
            (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                done.reply.body,
            )
                .into_response()
        }
        Err(err) => {
            warn!(error = %err, status = err.http_status(), "chat request failed");
            ApiError::from(err).into_response()
        }
    }
}
