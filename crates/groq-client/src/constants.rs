//! Groq API endpoints
//!
//! Groq exposes an OpenAI-compatible surface under `/openai/v1`. Only the base
//! URL is configurable; paths below are appended to it.

/// Default base URL for the OpenAI-compatible Groq API
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Chat completion path
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Model listing path (used by health checks)
pub const MODELS_PATH: &str = "/models";

/// Upper bound on the error text kept from a failed upstream response.
pub const MAX_ERROR_MESSAGE_LEN: usize = 512;
