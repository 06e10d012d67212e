//! Paystack webhook events
//!
//! Only parsed for logging. Signatures are not checked and nothing is stored;
//! the HTTP handler acknowledges every delivery.

use serde::Deserialize;
use tracing::info;

use crate::constants::CHARGE_SUCCESS;

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// A webhook delivery, reduced to what gets logged.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// `charge.success`: the payment is confirmed.
    ChargeSuccess {
        reference: Option<String>,
        amount: Option<u64>,
        currency: Option<String>,
        customer_email: Option<String>,
    },

    /// Any other event type.
    Other { event_type: String },

    /// Body was not a JSON object with an `event` field.
    Unrecognized,
}

impl WebhookEvent {
    /// Parse a raw delivery body. Never fails.
    pub fn parse(body: &[u8]) -> Self {
        let raw = match serde_json::from_slice::<RawEvent>(body) {
            Ok(raw) => raw,
            Err(_) => return WebhookEvent::Unrecognized,
        };
        let Some(event_type) = raw.event else {
            return WebhookEvent::Unrecognized;
        };
        if event_type != CHARGE_SUCCESS {
            return WebhookEvent::Other { event_type };
        }

        let text = |pointer: &str| {
            raw.data
                .pointer(pointer)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        WebhookEvent::ChargeSuccess {
            reference: text("/reference"),
            amount: raw.data.get("amount").and_then(|v| v.as_u64()),
            currency: text("/currency"),
            customer_email: text("/customer/email"),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::ChargeSuccess { .. } => CHARGE_SUCCESS,
            WebhookEvent::Other { event_type } => event_type,
            WebhookEvent::Unrecognized => "unrecognized",
        }
    }

    /// Emit the structured log line for this delivery.
    pub fn log(&self) {
        match self {
            WebhookEvent::ChargeSuccess {
                reference,
                amount,
                currency,
                customer_email,
            } => info!(
                reference = reference.as_deref(),
                amount = *amount,
                currency = currency.as_deref(),
                customer = customer_email.as_deref(),
                "payment confirmed"
            ),
            other => info!(event = other.event_type(), "webhook received"),
        }
    }
}
