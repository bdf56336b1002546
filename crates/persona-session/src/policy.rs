use std::net::IpAddr;
use std::time::Instant;

use crate::error::RateLimited;
use crate::ip::normalize_ip;
use crate::limiter::{FixedWindowLimiter, LimitScope, WindowPolicy};

/// Two-tier admission control: per client IP and per session
///
/// A request must pass both limiters. The IP limiter runs first, and a
/// request it rejects is not counted against the session. Requests without
/// a usable session id are keyed by their client IP on the session
/// limiter too, so they are throttled at least as strictly as per-IP.
#[derive(Debug)]
pub struct RateLimiter {
    ip: FixedWindowLimiter,
    session: FixedWindowLimiter,
}

impl RateLimiter {
    pub fn new(ip_policy: WindowPolicy, session_policy: WindowPolicy) -> Self {
        Self {
            ip: FixedWindowLimiter::new(LimitScope::Ip, ip_policy),
            session: FixedWindowLimiter::new(LimitScope::Session, session_policy),
        }
    }

    /// Cap tracked keys on each tier
    pub fn with_max_keys(self, max_keys: usize) -> Self {
        Self {
            ip: self.ip.with_max_keys(max_keys),
            session: self.session.with_max_keys(max_keys),
        }
    }

    pub fn check(&self, client_ip: IpAddr, session_id: Option<&str>) -> Result<(), RateLimited> {
        self.check_at(client_ip, session_id, Instant::now())
    }

    pub fn check_at(
        &self,
        client_ip: IpAddr,
        session_id: Option<&str>,
        now: Instant,
    ) -> Result<(), RateLimited> {
        let ip_key = format!("ip:{}", normalize_ip(client_ip));
        self.ip.check_at(&ip_key, now)?;

        let session_key = match session_id.filter(|id| !id.is_empty()) {
            Some(id) => format!("session:{}", id),
            None => ip_key,
        };
        self.session.check_at(&session_key, now)?;

        Ok(())
    }

    /// Drop elapsed windows on both tiers
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        self.ip.evict_expired_at(now) + self.session.evict_expired_at(now)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(WindowPolicy::per_ip_default(), WindowPolicy::per_session_default())
    }
}
