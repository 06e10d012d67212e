//! Rotating chat-completion dispatcher
//!
//! Delivers one chat request through the key pool. Each attempt uses the key
//! at the cursor; a failure rotates to the next key and tries again, at most
//! once per key. Only the final failure is surfaced to the caller.

use std::sync::Arc;
use std::time::Duration;

use provider::{
    ChatDefaults, ChatProvider, ChatRequest, ErrorClassification, InvalidRequest,
    UpstreamFailure, UpstreamReply,
};
use tracing::{info, warn};

use crate::classify::classify;
use crate::pool::KeyPool;

/// Tuning knobs for the retry loop, resolved once from configuration.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub defaults: ChatDefaults,
    /// Pause between attempts. Zero disables backoff.
    pub retry_backoff: Duration,
    /// Stop after the first `InvalidPayload` failure instead of trying every
    /// remaining key. Off by default: a payload error is retried on all keys.
    pub fail_fast_invalid_payload: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            defaults: ChatDefaults::default(),
            retry_backoff: Duration::ZERO,
            fail_fast_invalid_payload: false,
        }
    }
}

/// Terminal dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),

    #[error("no API keys configured")]
    NoCredentialsConfigured,

    /// Every attempt failed. Carries the last failure and which key produced it.
    #[error("all API keys failed after {attempts} attempt(s); last error on key {key_index}: {last}")]
    AllCredentialsFailed {
        attempts: usize,
        key_index: usize,
        last: UpstreamFailure,
    },
}

impl DispatchError {
    /// HTTP status to surface: 400 for bad input, 503 without keys, otherwise
    /// the last upstream status, or 500 when the last failure had none.
    pub fn http_status(&self) -> u16 {
        match self {
            DispatchError::InvalidRequest(_) => 400,
            DispatchError::NoCredentialsConfigured => 503,
            DispatchError::AllCredentialsFailed { last, .. } => last.status().unwrap_or(500),
        }
    }

    /// Number of upstream attempts made, where meaningful.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            DispatchError::AllCredentialsFailed { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// A successful dispatch.
#[derive(Debug)]
pub struct Dispatched {
    pub reply: UpstreamReply,
    pub key_index: usize,
    pub attempts: usize,
}

/// Key-rotating front for a `ChatProvider`.
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<KeyPool>,
    provider: Arc<dyn ChatProvider>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(pool: Arc<KeyPool>, provider: Arc<dyn ChatProvider>, options: DispatchOptions) -> Self {
        Self {
            pool,
            provider,
            options,
        }
    }

    pub fn pool(&self) -> &Arc<KeyPool> {
        &self.pool
    }

    pub fn provider(&self) -> &Arc<dyn ChatProvider> {
        &self.provider
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Validate a raw JSON body, then dispatch it.
    pub async fn dispatch_json(&self, body: &serde_json::Value) -> Result<Dispatched, DispatchError> {
        let request = ChatRequest::from_value(body)?;
        self.dispatch(&request).await
    }

    /// Send `request` upstream, rotating through the pool on failure.
    pub async fn dispatch(&self, request: &ChatRequest) -> Result<Dispatched, DispatchError> {
        if self.pool.is_empty() {
            warn!("chat request rejected: no API keys configured");
            metrics::counter!("relay_pool_exhausted_total", "reason" => "no_keys").increment(1);
            return Err(DispatchError::NoCredentialsConfigured);
        }

        let payload = request.resolve(&self.options.defaults);
        let max_attempts = self.pool.len().max(1);
        let mut last: Option<(usize, UpstreamFailure)> = None;
        let mut attempts = 0usize;

        while attempts < max_attempts {
            let selected = self
                .pool
                .current()
                .await
                .map_err(|_| DispatchError::NoCredentialsConfigured)?;
            let index = selected.index;
            attempts += 1;

            match self
                .provider
                .chat_completion(selected.key.expose(), &payload)
                .await
            {
                Ok(reply) => {
                    self.pool.record_success(index).await;
                    metrics::counter!("relay_upstream_attempts_total", "outcome" => "success")
                        .increment(1);
                    info!(
                        provider = self.provider.id(),
                        key_index = index,
                        attempts,
                        status = reply.status,
                        "chat completion delivered"
                    );
                    return Ok(Dispatched {
                        reply,
                        key_index: index,
                        attempts,
                    });
                }
                Err(failure) => {
                    let class = classify(&failure);
                    self.pool.record_failure(index).await;
                    metrics::counter!("relay_upstream_attempts_total", "outcome" => class.label())
                        .increment(1);
                    warn!(
                        provider = self.provider.id(),
                        key_index = index,
                        attempt = attempts,
                        max_attempts,
                        status = failure.status(),
                        classification = class.label(),
                        error = %failure.message(),
                        "upstream attempt failed, rotating key"
                    );
                    last = Some((index, failure));

                    if self.options.fail_fast_invalid_payload
                        && class == ErrorClassification::InvalidPayload
                    {
                        warn!(attempts, "payload rejected upstream, not trying remaining keys");
                        break;
                    }
                    if attempts < max_attempts && !self.options.retry_backoff.is_zero() {
                        tokio::time::sleep(self.options.retry_backoff).await;
                    }
                }
            }
        }

        metrics::counter!("relay_pool_exhausted_total", "reason" => "all_failed").increment(1);
        match last {
            Some((key_index, last)) => Err(DispatchError::AllCredentialsFailed {
                attempts,
                key_index,
                last,
            }),
            // Unreachable with a non-empty pool: the loop runs at least once.
            None => Err(DispatchError::NoCredentialsConfigured),
        }
    }
}
