//! reqwest-backed `ChatProvider` for Groq

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use provider::{ChatProvider, UpstreamFailure, UpstreamReply};
use serde::Deserialize;
use tracing::debug;

use crate::constants::{CHAT_COMPLETIONS_PATH, MAX_ERROR_MESSAGE_LEN, MODELS_PATH};
use crate::error::{Error, Result};

/// `GET /models` response body. Only the ids are kept.
#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Groq API client. Cheap to clone; the inner reqwest client is pooled.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
}

impl GroqClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::BaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_completion(
        &self,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> provider::Result<UpstreamReply> {
        let url = format!("{}{CHAT_COMPLETIONS_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| UpstreamFailure::Transport(transport_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(UpstreamFailure::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamFailure::Transport(format!("failed to read body: {e}")))?;
        debug!(status = status.as_u16(), bytes = body.len(), "chat completion succeeded");

        Ok(UpstreamReply {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_models(&self, api_key: &str) -> provider::Result<Vec<String>> {
        let url = format!("{}{MODELS_PATH}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| UpstreamFailure::Transport(transport_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(UpstreamFailure::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let list = response
            .json::<ModelList>()
            .await
            .map_err(|e| UpstreamFailure::Transport(format!("invalid model list: {e}")))?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

impl ChatProvider for GroqClient {
    fn id(&self) -> &str {
        "groq"
    }

    fn chat_completion<'a>(
        &'a self,
        api_key: &'a str,
        payload: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = provider::Result<UpstreamReply>> + Send + 'a>> {
        Box::pin(self.post_completion(api_key, payload))
    }

    fn list_models<'a>(
        &'a self,
        api_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = provider::Result<Vec<String>>> + Send + 'a>> {
        Box::pin(self.get_models(api_key))
    }
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// OpenAI-compatible APIs answer `{"error":{"message":"..."}}`; anything else
/// is returned as trimmed text, capped at `MAX_ERROR_MESSAGE_LEN` characters.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .or_else(|| value.get("error"))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return truncate(message);
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::from("<no body>");
    }
    truncate(trimmed)
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use tokio::net::TcpListener;

    /// Start a mock Groq API. `/chat/completions` echoes the bearer key and
    /// payload; a key of "bad" is answered with 401, "slow" never answers in time.
    async fn start_mock_groq() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let app = axum::Router::new()
                .route(
                    "/chat/completions",
                    post(
                        |headers: HeaderMap, axum::Json(body): axum::Json<serde_json::Value>| async move {
                            let auth = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            if auth == "Bearer bad" {
                                return (
                                    StatusCode::UNAUTHORIZED,
                                    axum::Json(serde_json::json!({
                                        "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
                                    })),
                                );
                            }
                            if auth == "Bearer slow" {
                                tokio::time::sleep(Duration::from_secs(5)).await;
                            }
                            (
                                StatusCode::OK,
                                axum::Json(serde_json::json!({
                                    "auth": auth,
                                    "echo": body,
                                    "usage": {"total_tokens": 7}
                                })),
                            )
                        },
                    ),
                )
                .route(
                    "/models",
                    get(|headers: HeaderMap| async move {
                        if headers.get("authorization").map(|v| v.as_bytes())
                            == Some(&b"Bearer bad"[..])
                        {
                            return (StatusCode::UNAUTHORIZED, "nope".to_string());
                        }
                        (
                            StatusCode::OK,
                            serde_json::json!({
                                "object": "list",
                                "data": [{"id": "llama-3.3-70b-versatile"}, {"id": "gemma2-9b-it"}]
                            })
                            .to_string(),
                        )
                    }),
                );
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn chat_completion_sends_bearer_and_payload() {
        let base = start_mock_groq().await;
        let client = GroqClient::new(&base, Duration::from_secs(5)).unwrap();
        let payload = serde_json::json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]});

        let reply = client.chat_completion("gsk_one", &payload).await.unwrap();
        assert_eq!(reply.status, 200);
        let json: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(json["auth"], "Bearer gsk_one");
        assert_eq!(json["echo"], payload);
    }

    #[tokio::test]
    async fn chat_completion_maps_non_2xx_to_status_failure() {
        let base = start_mock_groq().await;
        let client = GroqClient::new(&base, Duration::from_secs(5)).unwrap();

        let err = client
            .chat_completion("bad", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.message(), "Invalid API Key");
    }

    #[tokio::test]
    async fn chat_completion_timeout_is_transport_failure() {
        let base = start_mock_groq().await;
        let client = GroqClient::new(&base, Duration::from_millis(100)).unwrap();

        let err = client
            .chat_completion("slow", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), None);
        assert!(err.message().contains("timed out"), "got: {}", err.message());
    }

    #[tokio::test]
    async fn dead_upstream_is_transport_failure() {
        let client = GroqClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = client
            .chat_completion("gsk", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamFailure::Transport(_)));
    }

    #[tokio::test]
    async fn list_models_returns_ids() {
        let base = start_mock_groq().await;
        let client = GroqClient::new(&base, Duration::from_secs(5)).unwrap();

        let models = client.list_models("gsk_one").await.unwrap();
        assert_eq!(models, vec!["llama-3.3-70b-versatile", "gemma2-9b-it"]);

        let err = client.list_models("bad").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.message(), "nope");
    }

    #[test]
    fn new_rejects_base_url_without_scheme() {
        let err = GroqClient::new("api.groq.com", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::BaseUrl(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GroqClient::with_client(reqwest::Client::new(), "https://api.groq.com/openai/v1/");
        assert_eq!(client.base_url(), "https://api.groq.com/openai/v1");
    }

    #[test]
    fn error_message_prefers_openai_error_shape() {
        let body = r#"{"error":{"message":"Rate limit reached for model","type":"tokens"}}"#;
        assert_eq!(error_message(body), "Rate limit reached for model");
    }

    #[test]
    fn error_message_falls_back_to_text() {
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
        assert_eq!(error_message(""), "<no body>");
        assert_eq!(error_message(r#"{"error":"plain"}"#), "plain");
    }

    #[test]
    fn error_message_is_capped() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LEN * 2);
        assert_eq!(error_message(&long).len(), MAX_ERROR_MESSAGE_LEN);
    }
}
