//! Errors raised while constructing the Groq client

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("invalid base URL: {0}")]
    BaseUrl(String),
}

pub type Result<T> = std::result::Result<T, Error>;
