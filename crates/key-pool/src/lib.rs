//! Rotating key pool for the Groq relay
//!
//! Holds a fixed set of interchangeable API keys behind a cursor and a usage
//! ledger, and drives chat completions through them with bounded retry.
//!
//! Request lifecycle:
//! 1. Handler validates the body into a `ChatRequest`, rejecting bad shapes early
//! 2. Dispatcher takes the key at the cursor and calls the provider
//! 3. Success → usage counted, cursor rotates, upstream body returned verbatim
//! 4. Failure → failure counted, cursor rotates, next key tried
//! 5. Every key failed → last upstream status and message surfaced to the caller

pub mod classify;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod pool;

pub use classify::{classify, classify_429, classify_status};
pub use dispatch::{DispatchError, DispatchOptions, Dispatched, Dispatcher};
pub use error::{Error, Result};
pub use health::{HealthReport, HealthState};
pub use pool::{parse_key_list, KeyPool, KeyStatus, PeekedKey, PoolStatus, SelectedKey};
