//! Groq chat-completion client
//!
//! Thin reqwest wrapper implementing `provider::ChatProvider` against the
//! OpenAI-compatible Groq API. It knows nothing about key pools: every call
//! takes the bearer key to use, and every non-2xx status comes back as an
//! `UpstreamFailure` for the caller to act on.

pub mod client;
pub mod constants;
pub mod error;

pub use client::GroqClient;
pub use constants::*;
pub use error::{Error, Result};
