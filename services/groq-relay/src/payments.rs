//! Paystack forwarder routes
//!
//! Pure pass-through: Paystack's JSON comes back with 200 whatever Paystack
//! said, since it reports declines and unknown references in the body. Only a
//! failure to reach Paystack or read its answer turns into a 500.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use paystack::{PaymentRequest, PaystackClient, WebhookEvent};
use tracing::{error, instrument};

use crate::error::ApiError;

#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn create_payment(client: &PaystackClient, body: Bytes, request_id: String) -> Response {
    let request: PaymentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return ApiError::bad_request(format!("expected {{email, amount}}: {e}"))
                .into_response();
        }
    };

    match client.initialize(&request).await {
        Ok(json) => axum::Json(json).into_response(),
        Err(e) => {
            error!(error = %e, "create-payment failed");
            ApiError::from(e).into_response()
        }
    }
}

#[instrument(skip_all, fields(request_id = %request_id, reference = %reference))]
pub async fn verify_payment(
    client: &PaystackClient,
    reference: &str,
    request_id: String,
) -> Response {
    match client.verify(reference).await {
        Ok(json) => axum::Json(json).into_response(),
        Err(e) => {
            error!(error = %e, "verify-payment failed");
            ApiError::from(e).into_response()
        }
    }
}

/// Log the delivery and acknowledge it. Paystack retries anything but 200.
pub async fn webhook(body: Bytes) -> Response {
    WebhookEvent::parse(&body).log();
    StatusCode::OK.into_response()
}
