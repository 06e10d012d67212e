//! Paystack API endpoints and defaults

/// Default base URL for the Paystack API
pub const PAYSTACK_API_BASE: &str = "https://api.paystack.co";

/// Transaction initialization path
pub const INITIALIZE_PATH: &str = "/transaction/initialize";

/// Transaction verification path; the reference is appended as a segment
pub const VERIFY_PATH: &str = "/transaction/verify";

/// Currency sent with every initialization (West African CFA franc)
pub const DEFAULT_CURRENCY: &str = "XOF";

/// Paystack amounts are in the currency's subunit.
pub const SUBUNITS_PER_UNIT: u64 = 100;

/// Webhook event type for a confirmed charge
pub const CHARGE_SUCCESS: &str = "charge.success";
