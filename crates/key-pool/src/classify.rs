//! Upstream failure classification
//!
//! Every class rotates to the next key. The classification exists so logs and
//! metrics can tell a throttled key from a revoked one, and so the dispatcher
//! can optionally stop early on payload errors that no key would fix.

use provider::{ErrorClassification, UpstreamFailure};

/// Phrases in a 429 body that mean a daily or account quota is spent, as
/// opposed to a per-minute rate limit that clears on its own.
const QUOTA_PATTERNS: &[&str] = &[
    "per day",
    "(tpd)",
    "(rpd)",
    "quota",
    "exceeded your",
];

/// Classify a 429 response body.
pub fn classify_429(body: &str) -> ErrorClassification {
    let lower = body.to_lowercase();
    if QUOTA_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClassification::QuotaExceeded
    } else {
        ErrorClassification::Transient
    }
}

/// Classify an upstream error by HTTP status and body text.
pub fn classify_status(status: u16, body: &str) -> ErrorClassification {
    match status {
        429 => classify_429(body),
        401 | 403 => ErrorClassification::Permanent,
        400 | 404 | 413 | 422 => ErrorClassification::InvalidPayload,
        _ => ErrorClassification::Transient,
    }
}

/// Classify one failed attempt. Transport errors are always transient.
pub fn classify(failure: &UpstreamFailure) -> ErrorClassification {
    match failure {
        UpstreamFailure::Status { status, message } => classify_status(*status, message),
        UpstreamFailure::Transport(_) => ErrorClassification::Transient,
    }
}
