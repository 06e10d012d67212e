//! Upstream chat-completion abstraction
//!
//! Defines the `ChatProvider` trait that decouples the key-rotation logic from
//! the HTTP client that talks to the AI provider. The production implementation
//! lives in `groq-client`; tests plug in scripted providers to count calls and
//! control per-key outcomes.

pub mod chat;

pub use chat::{ChatDefaults, ChatRequest, InvalidRequest};

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// How an upstream failure relates to the credential that produced it.
///
/// Every class rotates to the next key. `InvalidPayload` is the one class that
/// fails identically on every key, so a dispatcher may choose to stop early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// Timeouts, connection errors, 5xx, per-minute 429s
    Transient,
    /// 429 whose body names a daily or account quota
    QuotaExceeded,
    /// 401/403: the key is invalid or revoked
    Permanent,
    /// 400/404/413/422: the request body itself is rejected
    InvalidPayload,
}

impl ErrorClassification {
    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClassification::Transient => "transient",
            ErrorClassification::QuotaExceeded => "quota_exceeded",
            ErrorClassification::Permanent => "permanent",
            ErrorClassification::InvalidPayload => "invalid_payload",
        }
    }
}

/// A 2xx upstream reply. The body is kept as raw bytes so it can be handed
/// back to the caller without re-encoding.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Bytes,
}

/// One failed upstream attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamFailure {
    /// Upstream answered with a non-2xx status.
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    /// No HTTP status: connect error, timeout, unreadable body.
    #[error("upstream transport error: {0}")]
    Transport(String),
}

impl UpstreamFailure {
    /// HTTP status reported by upstream, if the failure got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamFailure::Status { status, .. } => Some(*status),
            UpstreamFailure::Transport(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UpstreamFailure::Status { message, .. } => message,
            UpstreamFailure::Transport(message) => message,
        }
    }
}

/// Result alias for upstream calls.
pub type Result<T> = std::result::Result<T, UpstreamFailure>;

/// An OpenAI-compatible chat-completion API reachable with a bearer key.
///
/// Uses `Pin<Box<dyn Future>>` return types so the relay can hold an
/// `Arc<dyn ChatProvider>`.
pub trait ChatProvider: Send + Sync {
    /// Identifier for logging (e.g. "groq")
    fn id(&self) -> &str;

    /// POST one chat-completion payload using `api_key`.
    ///
    /// Returns `Ok` only for 2xx responses; every other status is an
    /// `UpstreamFailure::Status` carrying the upstream error text.
    fn chat_completion<'a>(
        &'a self,
        api_key: &'a str,
        payload: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamReply>> + Send + 'a>>;

    /// List the model identifiers visible to `api_key`. Used by health checks.
    fn list_models<'a>(
        &'a self,
        api_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_failure_exposes_status_and_message() {
        let failure = UpstreamFailure::Status {
            status: 429,
            message: "rate limit reached".into(),
        };
        assert_eq!(failure.status(), Some(429));
        assert_eq!(failure.message(), "rate limit reached");
        assert_eq!(failure.to_string(), "upstream returned 429: rate limit reached");
    }

    #[test]
    fn transport_failure_has_no_status() {
        let failure = UpstreamFailure::Transport("connection refused".into());
        assert_eq!(failure.status(), None);
        assert_eq!(failure.message(), "connection refused");
    }

    #[test]
    fn classification_labels_are_distinct() {
        let labels = [
            ErrorClassification::Transient.label(),
            ErrorClassification::QuotaExceeded.label(),
            ErrorClassification::Permanent.label(),
            ErrorClassification::InvalidPayload.label(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
