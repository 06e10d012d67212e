//! Paystack pass-through forwarder
//!
//! Initializes and verifies transactions with the server-held secret key and
//! hands Paystack's JSON back untouched. Nothing is persisted and nothing is
//! retried: a failed call is reported once and the caller decides.
//!
//! Webhook payloads are only parsed far enough to log confirmed charges.

pub mod client;
pub mod constants;
pub mod error;
pub mod webhook;

pub use client::{PaymentRequest, PaystackClient};
pub use constants::*;
pub use error::{Error, Result};
pub use webhook::WebhookEvent;
