//! Credential pool, rotation cursor and usage ledger
//!
//! The pool holds an immutable, ordered list of interchangeable API keys and a
//! small piece of mutable bookkeeping: the cursor naming the key to try next,
//! plus per-key success and failure counters. All bookkeeping sits behind one
//! mutex so that reading the cursor, moving it and bumping a counter happen as
//! a unit. The lock is never held across an upstream call.
//!
//! Rotation is round-robin: after every attempt, successful or not, the cursor
//! moves one past the key that was used. The move only happens if the cursor
//! still points at that key, so two requests failing on the same key at once
//! advance it once instead of skipping a healthy neighbour.

use std::collections::HashMap;

use common::Secret;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Characters of a key shown in status output.
pub const VISIBLE_KEY_CHARS: usize = 4;

/// Split a configured key list on commas and newlines, dropping blanks.
pub fn parse_key_list(raw: &str) -> Vec<Secret<String>> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(Secret::from)
        .collect()
}

/// A key chosen for one upstream attempt.
#[derive(Debug)]
pub struct SelectedKey<'a> {
    pub index: usize,
    pub key: &'a Secret<String>,
}

/// Result of the legacy "take next key" debug operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeekedKey {
    pub key_index: usize,
    pub last_chars: String,
    pub usage: u64,
}

/// Per-key entry of the status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatus {
    pub key_index: usize,
    pub usage: u64,
    pub is_current: bool,
    pub last_chars: String,
    pub failures: u64,
}

/// Snapshot of the whole pool for `/api/keys-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub total_keys: usize,
    /// `None` when the pool is empty.
    pub current_key_index: Option<usize>,
    pub key_status: Vec<KeyStatus>,
}

#[derive(Debug, Default)]
struct Ledger {
    cursor: usize,
    usage: HashMap<usize, u64>,
    failures: HashMap<usize, u64>,
}

/// Pool of interchangeable upstream API keys.
pub struct KeyPool {
    keys: Vec<Secret<String>>,
    ledger: Mutex<Ledger>,
}

impl KeyPool {
    /// Create a pool over `keys`. The cursor starts at the first key.
    pub fn new(keys: Vec<Secret<String>>) -> Self {
        info!(keys = keys.len(), "key pool initialized");
        Self {
            keys,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key at the cursor.
    ///
    /// Returns `PoolExhausted` when no keys are configured.
    pub async fn current(&self) -> Result<SelectedKey<'_>> {
        if self.keys.is_empty() {
            return Err(Error::PoolExhausted("no API keys configured".into()));
        }
        let index = self.ledger.lock().await.cursor;
        Ok(SelectedKey {
            index,
            key: &self.keys[index],
        })
    }

    /// Move the cursor to the next key, wrapping at the end. No-op on an
    /// empty pool.
    pub async fn advance(&self) {
        if self.keys.is_empty() {
            return;
        }
        let mut ledger = self.ledger.lock().await;
        ledger.cursor = (ledger.cursor + 1) % self.keys.len();
    }

    /// Count a successful use of `index` and rotate past it.
    pub async fn record_success(&self, index: usize) {
        if index >= self.keys.len() {
            return;
        }
        let mut ledger = self.ledger.lock().await;
        *ledger.usage.entry(index).or_insert(0) += 1;
        self.rotate_past(&mut ledger, index);
    }

    /// Count a failed attempt on `index` and rotate past it.
    pub async fn record_failure(&self, index: usize) {
        if index >= self.keys.len() {
            return;
        }
        let mut ledger = self.ledger.lock().await;
        *ledger.failures.entry(index).or_insert(0) += 1;
        self.rotate_past(&mut ledger, index);
    }

    /// Current cursor, or `None` for an empty pool.
    pub async fn cursor(&self) -> Option<usize> {
        if self.keys.is_empty() {
            return None;
        }
        Some(self.ledger.lock().await.cursor)
    }

    /// Successful uses recorded for `index`.
    pub async fn usage(&self, index: usize) -> u64 {
        self.ledger
            .lock()
            .await
            .usage
            .get(&index)
            .copied()
            .unwrap_or(0)
    }

    /// Legacy debug peek: hand out the current key's identity, count it as a
    /// use and advance, all in one step. Never returns the secret itself.
    pub async fn take_next(&self) -> Result<PeekedKey> {
        if self.keys.is_empty() {
            return Err(Error::PoolExhausted("no API keys configured".into()));
        }
        let mut ledger = self.ledger.lock().await;
        let index = ledger.cursor;
        let usage = {
            let count = ledger.usage.entry(index).or_insert(0);
            *count += 1;
            *count
        };
        ledger.cursor = (index + 1) % self.keys.len();
        debug!(key_index = index, usage, "debug peek advanced the cursor");
        Ok(PeekedKey {
            key_index: index,
            last_chars: self.keys[index].last_chars(VISIBLE_KEY_CHARS),
            usage,
        })
    }

    /// Read-only snapshot of cursor and counters, with redacted key fragments.
    pub async fn status(&self) -> PoolStatus {
        let ledger = self.ledger.lock().await;
        let current = (!self.keys.is_empty()).then_some(ledger.cursor);

        let key_status = self
            .keys
            .iter()
            .enumerate()
            .map(|(index, key)| KeyStatus {
                key_index: index,
                usage: ledger.usage.get(&index).copied().unwrap_or(0),
                is_current: current == Some(index),
                last_chars: key.last_chars(VISIBLE_KEY_CHARS),
                failures: ledger.failures.get(&index).copied().unwrap_or(0),
            })
            .collect();

        PoolStatus {
            total_keys: self.keys.len(),
            current_key_index: current,
            key_status,
        }
    }

    fn rotate_past(&self, ledger: &mut Ledger, index: usize) {
        if ledger.cursor == index {
            ledger.cursor = (index + 1) % self.keys.len();
        } else {
            debug!(
                key_index = index,
                cursor = ledger.cursor,
                "cursor already moved by a concurrent request"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pool_of(keys: &[&str]) -> KeyPool {
        KeyPool::new(keys.iter().map(|k| Secret::from(*k)).collect())
    }

    #[test]
    fn parse_key_list_splits_and_trims() {
        let keys = parse_key_list(" gsk_a, gsk_b ,,\ngsk_c\n\n");
        let raw: Vec<&str> = keys.iter().map(|k| k.expose().as_str()).collect();
        assert_eq!(raw, vec!["gsk_a", "gsk_b", "gsk_c"]);
    }

    #[test]
    fn parse_key_list_empty_input() {
        assert!(parse_key_list("").is_empty());
        assert!(parse_key_list(" , \n ").is_empty());
    }

    #[tokio::test]
    async fn current_returns_first_key_initially() {
        let pool = pool_of(&["k1", "k2"]);
        let selected = pool.current().await.unwrap();
        assert_eq!(selected.index, 0);
        assert_eq!(selected.key.expose(), "k1");
    }

    #[tokio::test]
    async fn current_on_empty_pool_is_exhausted() {
        let pool = pool_of(&[]);
        let err = pool.current().await.unwrap_err();
        assert!(matches!(err, Error::PoolExhausted(_)));
        assert!(pool.is_empty());
        assert_eq!(pool.cursor().await, None);
    }

    #[tokio::test]
    async fn advance_wraps_modulo_len() {
        let pool = pool_of(&["k1", "k2", "k3"]);
        pool.advance().await;
        pool.advance().await;
        assert_eq!(pool.cursor().await, Some(2));
        pool.advance().await;
        assert_eq!(pool.cursor().await, Some(0));
    }

    #[tokio::test]
    async fn advance_on_empty_pool_is_noop() {
        let pool = pool_of(&[]);
        pool.advance().await;
        assert_eq!(pool.cursor().await, None);
    }

    #[tokio::test]
    async fn record_success_counts_and_rotates() {
        let pool = pool_of(&["k1", "k2"]);
        pool.record_success(0).await;
        assert_eq!(pool.usage(0).await, 1);
        assert_eq!(pool.cursor().await, Some(1));

        pool.record_success(1).await;
        assert_eq!(pool.usage(1).await, 1);
        assert_eq!(pool.cursor().await, Some(0));
    }

    #[tokio::test]
    async fn record_failure_rotates_without_usage() {
        let pool = pool_of(&["k1", "k2"]);
        pool.record_failure(0).await;
        assert_eq!(pool.usage(0).await, 0);
        assert_eq!(pool.cursor().await, Some(1));

        let status = pool.status().await;
        assert_eq!(status.key_status[0].failures, 1);
    }

    #[tokio::test]
    async fn stale_failure_does_not_double_advance() {
        // Two in-flight requests both picked key 0 and both failed.
        let pool = pool_of(&["k1", "k2", "k3"]);
        pool.record_failure(0).await;
        pool.record_failure(0).await;
        assert_eq!(
            pool.cursor().await,
            Some(1),
            "second failure on an already-rotated key must not skip key 1"
        );
    }

    #[tokio::test]
    async fn out_of_range_index_is_ignored() {
        let pool = pool_of(&["k1"]);
        pool.record_success(5).await;
        pool.record_failure(5).await;
        assert_eq!(pool.usage(5).await, 0);
        assert_eq!(pool.cursor().await, Some(0));
    }

    #[tokio::test]
    async fn status_reports_redacted_fragments() {
        let pool = pool_of(&["gsk_aaaa1111", "gsk_bbbb2222"]);
        pool.record_success(0).await;

        let status = pool.status().await;
        assert_eq!(status.total_keys, 2);
        assert_eq!(status.current_key_index, Some(1));
        assert_eq!(status.key_status[0].usage, 1);
        assert_eq!(status.key_status[0].last_chars, "1111");
        assert!(!status.key_status[0].is_current);
        assert!(status.key_status[1].is_current);
        assert_eq!(status.key_status[1].last_chars, "2222");
    }

    #[tokio::test]
    async fn status_serializes_camel_case() {
        let pool = pool_of(&["gsk_aaaa1111"]);
        let json = serde_json::to_value(pool.status().await).unwrap();
        assert_eq!(json["totalKeys"], 1);
        assert_eq!(json["currentKeyIndex"], 0);
        assert_eq!(json["keyStatus"][0]["keyIndex"], 0);
        assert_eq!(json["keyStatus"][0]["isCurrent"], true);
        assert_eq!(json["keyStatus"][0]["lastChars"], "1111");
        assert!(!json.to_string().contains("gsk_aaaa1111"));
    }

    #[tokio::test]
    async fn status_of_empty_pool() {
        let pool = pool_of(&[]);
        let json = serde_json::to_value(pool.status().await).unwrap();
        assert_eq!(json["totalKeys"], 0);
        assert!(json["currentKeyIndex"].is_null());
        assert_eq!(json["keyStatus"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn take_next_counts_and_advances() {
        let pool = pool_of(&["gsk_aaaa1111", "gsk_bbbb2222"]);
        let first = pool.take_next().await.unwrap();
        assert_eq!(first.key_index, 0);
        assert_eq!(first.usage, 1);
        assert_eq!(first.last_chars, "1111");

        let second = pool.take_next().await.unwrap();
        assert_eq!(second.key_index, 1);
        assert_eq!(pool.cursor().await, Some(0));
    }

    #[tokio::test]
    async fn take_next_on_empty_pool_is_exhausted() {
        let pool = pool_of(&[]);
        assert!(pool.take_next().await.is_err());
    }

    #[tokio::test]
    async fn concurrent_successes_sum_to_request_count() {
        let pool = Arc::new(pool_of(&["k1", "k2", "k3"]));
        let mut handles = Vec::new();
        for _ in 0..30 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let index = pool.current().await.unwrap().index;
                pool.record_success(index).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let status = pool.status().await;
        let total: u64 = status.key_status.iter().map(|k| k.usage).sum();
        assert_eq!(total, 30);
    }
}
