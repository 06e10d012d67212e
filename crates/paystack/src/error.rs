//! Paystack forwarder errors

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No secret key was configured at startup.
    #[error("payment provider not configured")]
    NotConfigured,

    #[error("invalid payment request: {0}")]
    InvalidRequest(String),

    /// Connect error, timeout, or a body that could not be read.
    #[error("paystack request failed: {0}")]
    Transport(String),

    /// Paystack answered with something other than JSON.
    #[error("invalid paystack response (status {status}): {message}")]
    InvalidResponse { status: u16, message: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("invalid base URL: {0}")]
    BaseUrl(String),
}

pub type Result<T> = std::result::Result<T, Error>;
