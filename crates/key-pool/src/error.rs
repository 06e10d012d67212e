//! Error types for pool operations

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pool exhausted: {0}")]
    PoolExhausted(String),
}

pub type Result<T> = std::result::Result<T, Error>;
