//! Single-use proof identifiers.
//!
//! One guarded map, swept opportunistically inside the same critical
//! section that answers the membership question. There is no background
//! eviction task; capacity is bounded in practice by the proof freshness
//! window times the arrival rate.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;

#[derive(Debug, Default)]
pub struct ReplayStore {
    // jti -> expiration unix seconds
    seen: Mutex<HashMap<String, i64>>,
}

impl ReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `jti` until `expires_at`. Returns false when the id was
    /// already present — the caller must treat that as a replay. Eviction
    /// of expired entries and the insert happen under one lock, so two
    /// concurrent calls with the same jti cannot both succeed.
    pub fn mark(&self, jti: &str, expires_at: i64) -> bool {
        self.mark_at(jti, expires_at, Utc::now().timestamp())
    }

    fn mark_at(&self, jti: &str, expires_at: i64, now: i64) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.retain(|_, expiry| *expiry > now);
        if seen.contains_key(jti) {
            return false;
        }
        seen.insert(jti.to_string(), expires_at);
        true
    }

    pub fn contains(&self, jti: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(jti)
    }
}
