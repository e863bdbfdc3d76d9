//! Coarse fixed-window rate limiting keyed by (origin, client host).
//!
//! One window for the whole process: when the clock crosses the window
//! end, every bucket is wiped at once. Best-effort by design — it may
//! over-admit briefly at a rollover but never under-admits within a
//! window.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;

pub const WINDOW_SECS: i64 = 60;

#[derive(Debug)]
pub struct WindowLimiter {
    cap: u32,
    inner: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    window_end: i64,
    counts: HashMap<String, u32>,
}

impl WindowLimiter {
    pub fn new(cap: u32) -> Self {
        Self {
            cap,
            inner: Mutex::new(WindowState {
                window_end: Utc::now().timestamp() + WINDOW_SECS,
                counts: HashMap::new(),
            }),
        }
    }

    #[cfg(test)]
    fn new_at(cap: u32, now: i64) -> Self {
        Self {
            cap,
            inner: Mutex::new(WindowState {
                window_end: now + WINDOW_SECS,
                counts: HashMap::new(),
            }),
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Utc::now().timestamp())
    }

    fn allow_at(&self, key: &str, now: i64) -> bool {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if now >= state.window_end {
            state.window_end = now + WINDOW_SECS;
            state.counts.clear();
        }
        let count = state.counts.get(key).copied().unwrap_or(0);
        if count >= self.cap {
            return false;
        }
        state.counts.insert(key.to_string(), count + 1);
        true
    }
}

/// Bucket key for a request: the Origin header value joined with the
/// host part of the peer address (port stripped).
pub fn bucket_key(origin: &str, remote_host: &str) -> String {
    format!("{origin}|{remote_host}")
}
