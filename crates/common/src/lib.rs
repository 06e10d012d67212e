//! Shared types for the groq-relay workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
