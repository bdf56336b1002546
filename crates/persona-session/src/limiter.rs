//! Fixed-window request counting
//!
//! A key's window opens on its first request and stays open for the
//! configured duration; the next request after that opens a fresh one. Up
//! to twice the nominal rate can pass around a window boundary.

use dashmap::DashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{RateLimited, Result, SessionError};

pub const DEFAULT_MAX_KEYS: usize = 100_000;

/// Which limiter rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitScope {
    Ip,
    Session,
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitScope::Ip => f.write_str("ip"),
            LimitScope::Session => f.write_str("session"),
        }
    }
}

/// Admission budget: `max_requests` per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl WindowPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(SessionError::InvalidConfig("max_requests must be at least 1".to_string()));
        }
        if window.is_zero() {
            return Err(SessionError::InvalidConfig("window must be longer than zero".to_string()));
        }
        Ok(Self { max_requests, window })
    }

    /// 10 requests per hour
    pub const fn per_ip_default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60 * 60),
        }
    }

    /// 10 requests per minute
    pub const fn per_session_default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }

    /// Advisory `Retry-After` value: the full window, whatever is left of it
    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// Outcome of an admitted check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    pub limit: u32,
    pub remaining: u32,
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: u32,
}

impl Window {
    fn is_expired(&self, now: Instant, length: Duration) -> bool {
        now.saturating_duration_since(self.started_at) > length
    }
}

/// Per-key fixed-window counter
///
/// The expiry check, reset and increment for a key happen under that key's
/// map entry, so concurrent checks can never admit more than
/// `max_requests` in one window.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    scope: LimitScope,
    policy: WindowPolicy,
    max_keys: usize,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(scope: LimitScope, policy: WindowPolicy) -> Self {
        Self {
            scope,
            policy,
            max_keys: DEFAULT_MAX_KEYS,
            windows: DashMap::new(),
        }
    }

    /// Cap the number of tracked keys
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }

    /// Count one request against `key`
    pub fn check(&self, key: &str) -> std::result::Result<RateStatus, RateLimited> {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> std::result::Result<RateStatus, RateLimited> {
        if !self.windows.contains_key(key) {
            self.make_room(now);
        }

        let limit = self.policy.max_requests;
        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window { started_at: now, count: 0 });

        if window.is_expired(now, self.policy.window) {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= limit {
            return Err(RateLimited {
                scope: self.scope,
                retry_after_secs: self.policy.retry_after_secs(),
            });
        }

        window.count += 1;
        Ok(RateStatus {
            limit,
            remaining: limit - window.count,
        })
    }

    /// Drop keys whose window has elapsed; they would reset anyway
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let length = self.policy.window;
        self.windows.retain(|_, window| !window.is_expired(now, length));
        before.saturating_sub(self.windows.len())
    }

    /// Get current number of tracked keys
    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    fn make_room(&self, now: Instant) {
        if self.windows.len() < self.max_keys {
            return;
        }
        if self.evict_expired_at(now) > 0 && self.windows.len() < self.max_keys {
            return;
        }

        let oldest = self
            .windows
            .iter()
            .min_by_key(|entry| entry.value().started_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.windows.remove(&key);
            tracing::warn!(scope = %self.scope, key = %key, "Rate limiter full, dropped oldest window");
        }
    }
}
