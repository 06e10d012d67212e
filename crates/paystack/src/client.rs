//! reqwest-backed Paystack client

use std::time::Duration;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{DEFAULT_CURRENCY, INITIALIZE_PATH, SUBUNITS_PER_UNIT, VERIFY_PATH};
use crate::error::{Error, Result};

/// Body of `POST /create-payment`. `amount` is in whole currency units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentRequest {
    pub email: String,
    pub amount: f64,
}

impl PaymentRequest {
    /// Amount in Paystack subunits, rounded to the nearest one.
    pub fn amount_in_subunits(&self) -> Result<u64> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidRequest("amount must be a positive number".into()));
        }
        let subunits = (self.amount * SUBUNITS_PER_UNIT as f64).round();
        if subunits > u64::MAX as f64 {
            return Err(Error::InvalidRequest("amount is too large".into()));
        }
        Ok(subunits as u64)
    }

    fn validate(&self) -> Result<u64> {
        if self.email.trim().is_empty() {
            return Err(Error::InvalidRequest("email is required".into()));
        }
        self.amount_in_subunits()
    }
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: u64,
    currency: &'a str,
}

/// Paystack API client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    base_url: String,
    currency: String,
    secret: Option<Secret<String>>,
}

impl PaystackClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        secret: Option<Secret<String>>,
    ) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::BaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            secret,
        })
    }

    /// Override the currency sent on initialization.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// `POST /transaction/initialize`. Returns Paystack's JSON as-is, whatever
    /// its status: Paystack reports business errors in the body.
    pub async fn initialize(&self, request: &PaymentRequest) -> Result<serde_json::Value> {
        let secret = self.secret.as_ref().ok_or(Error::NotConfigured)?;
        let amount = request.validate()?;

        let body = InitializeBody {
            email: request.email.trim(),
            amount,
            currency: &self.currency,
        };
        let url = format!("{}{INITIALIZE_PATH}", self.base_url);
        debug!(amount, currency = %self.currency, "initializing transaction");

        let response = self
            .http
            .post(&url)
            .bearer_auth(secret.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        read_json(response).await
    }

    /// `GET /transaction/verify/{reference}`.
    pub async fn verify(&self, reference: &str) -> Result<serde_json::Value> {
        let secret = self.secret.as_ref().ok_or(Error::NotConfigured)?;
        validate_reference(reference)?;

        let url = format!("{}{VERIFY_PATH}/{reference}", self.base_url);
        debug!(reference, "verifying transaction");

        let response = self
            .http
            .get(&url)
            .bearer_auth(secret.expose())
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value> {
    let status = response.status().as_u16();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Transport(format!("failed to read body: {e}")))?;
    if !(200..300).contains(&status) {
        warn!(status, "paystack returned a non-success status");
    }
    serde_json::from_slice(&bytes).map_err(|e| Error::InvalidResponse {
        status,
        message: e.to_string(),
    })
}

/// References become a URL path segment, so only Paystack's reference
/// alphabet is allowed through.
fn validate_reference(reference: &str) -> Result<()> {
    let valid = !reference.is_empty()
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '='));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!("invalid reference: {reference:?}")))
    }
}
