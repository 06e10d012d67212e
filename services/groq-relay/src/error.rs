//! HTTP error responses
//!
//! Every failure the relay reports to a caller is rendered as
//! `{"error": "...", "details": "...", "attempts": n}` with `details` and
//! `attempts` omitted when they do not apply.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use key_pool::DispatchError;
use serde::Serialize;

/// A caller-facing error: status plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<usize>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details: None,
                attempts: None,
            },
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body.details = Some(details.into());
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.body.attempts = Some(attempts);
        self
    }

    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid request").with_details(details)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        // Upstream statuses outside the valid range collapse to 500.
        let status = StatusCode::from_u16(err.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            DispatchError::InvalidRequest(invalid) => Self::bad_request(invalid.0),
            DispatchError::NoCredentialsConfigured => {
                Self::new(status, "no API keys configured")
            }
            DispatchError::AllCredentialsFailed { attempts, last, .. } => {
                Self::new(status, "all API keys failed")
                    .with_details(last.message().to_string())
                    .with_attempts(attempts)
            }
        }
    }
}

impl From<paystack::Error> for ApiError {
    fn from(err: paystack::Error) -> Self {
        match err {
            paystack::Error::NotConfigured => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            paystack::Error::InvalidRequest(details) => Self::bad_request(details),
            paystack::Error::Transport(_)
            | paystack::Error::InvalidResponse { .. }
            | paystack::Error::Http(_)
            | paystack::Error::BaseUrl(_) => Self::internal(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self.body)).into_response()
    }
}
