//! Inbound chat request shape and default resolution
//!
//! The relay accepts `{messages, model?, temperature?, max_tokens?}`. Message
//! objects are opaque: only the outer shape is checked. Missing options are
//! filled from `ChatDefaults` once, at the boundary, before dispatch.

use serde::Serialize;
use serde_json::Value;

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Sampling temperature used when the caller does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Completion token budget used when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Caller payload rejected before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid request: {0}")]
pub struct InvalidRequest(pub String);

/// Named defaults applied to absent request options.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDefaults {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// A validated chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Value>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Body sent to `/chat/completions`.
#[derive(Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    messages: &'a [Value],
    temperature: f64,
    max_tokens: u32,
}

impl ChatRequest {
    /// Validate a decoded JSON body.
    ///
    /// `messages` must be a non-empty array. Optional fields must have the
    /// right type when present; JSON `null` counts as absent.
    pub fn from_value(body: &Value) -> Result<Self, InvalidRequest> {
        let object = body
            .as_object()
            .ok_or_else(|| InvalidRequest("request body must be a JSON object".into()))?;

        let messages = match object.get("messages") {
            Some(Value::Array(items)) if !items.is_empty() => items.clone(),
            Some(Value::Array(_)) => {
                return Err(InvalidRequest("messages must not be empty".into()));
            }
            Some(_) => return Err(InvalidRequest("messages must be an array".into())),
            None => return Err(InvalidRequest("messages is required".into())),
        };

        let model = match object.get("model") {
            None | Some(Value::Null) => None,
            Some(Value::String(m)) if !m.trim().is_empty() => Some(m.clone()),
            Some(_) => return Err(InvalidRequest("model must be a non-empty string".into())),
        };

        let temperature = match object.get("temperature") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_f64()
                    .ok_or_else(|| InvalidRequest("temperature must be a number".into()))?,
            ),
        };

        let max_tokens = match object.get("max_tokens") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let n = v
                    .as_u64()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        InvalidRequest("max_tokens must be a positive integer".into())
                    })?;
                Some(u32::try_from(n).map_err(|_| {
                    InvalidRequest(format!("max_tokens must not exceed {}", u32::MAX))
                })?)
            }
        };

        Ok(Self {
            messages,
            model,
            temperature,
            max_tokens,
        })
    }

    /// Build the upstream payload, explicit values overriding `defaults`.
    pub fn resolve(&self, defaults: &ChatDefaults) -> Value {
        let payload = CompletionPayload {
            model: self.model.as_deref().unwrap_or(&defaults.model),
            messages: &self.messages,
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        };
        // Serializing borrowed strings, numbers and JSON values cannot fail.
        serde_json::to_value(payload).unwrap_or(Value::Null)
    }
}
