//! Upstream reachability probe
//!
//! Lists models with the key at the cursor. Purely diagnostic: the cursor and
//! the ledger are never touched, whatever the outcome.

use serde::Serialize;
use tracing::warn;

use crate::dispatch::Dispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Body of `/api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq_models: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_keys: Option<usize>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

impl Dispatcher {
    /// Probe the upstream with the current key.
    pub async fn health(&self) -> HealthReport {
        let pool = self.pool();
        let selected = match pool.current().await {
            Ok(selected) => selected,
            Err(_) => {
                return HealthReport {
                    status: HealthState::Unhealthy,
                    message: "no API keys configured".into(),
                    groq_models: None,
                    available_keys: Some(0),
                };
            }
        };

        match self.provider().list_models(selected.key.expose()).await {
            Ok(models) => HealthReport {
                status: HealthState::Healthy,
                message: format!("{} API reachable", self.provider().id()),
                groq_models: Some(models.len()),
                available_keys: Some(pool.len()),
            },
            Err(failure) => {
                warn!(
                    key_index = selected.index,
                    status = failure.status(),
                    error = %failure.message(),
                    "health probe failed"
                );
                HealthReport {
                    status: HealthState::Unhealthy,
                    message: format!("upstream check failed: {}", failure.message()),
                    groq_models: None,
                    available_keys: Some(pool.len()),
                }
            }
        }
    }
}
