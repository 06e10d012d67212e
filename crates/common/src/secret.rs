//! Redacting wrapper for API keys and provider secrets

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value. Debug and Display never print the inner value, and the
/// memory is zeroed on drop.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the raw value. Only call this at the point the secret leaves the
    /// process (an outbound Authorization header).
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Trailing `n` characters of the secret, for telling keys apart in
    /// operator-facing output. Keys no longer than `n` characters are fully
    /// masked so a short key is never disclosed in full.
    pub fn last_chars(&self, n: usize) -> String {
        let count = self.0.chars().count();
        if count <= n {
            return "*".repeat(count);
        }
        self.0.chars().skip(count - n).collect()
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::new(String::from("gsk_live_abcdef"));
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn expose_returns_raw_value() {
        let secret = Secret::from("gsk_live_abcdef");
        assert_eq!(secret.expose(), "gsk_live_abcdef");
    }

    #[test]
    fn last_chars_returns_suffix() {
        let secret = Secret::from("gsk_live_abcdef");
        assert_eq!(secret.last_chars(4), "cdef");
    }

    #[test]
    fn last_chars_masks_short_keys() {
        let secret = Secret::from("abc");
        assert_eq!(secret.last_chars(4), "***");
        assert_eq!(Secret::from("").last_chars(4), "");
    }
}
