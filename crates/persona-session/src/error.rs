use thiserror::Error;

use crate::limiter::LimitScope;

/// Rejection issued by a rate limiter
///
/// `retry_after_secs` is an advisory value equal to the limiter's window
/// length, not the time left in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{scope} rate limit exceeded, retry after {retry_after_secs}s")]
pub struct RateLimited {
    pub scope: LimitScope,
    pub retry_after_secs: u64,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
