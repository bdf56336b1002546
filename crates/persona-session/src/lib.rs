//! Session-scoped conversation history and request admission control.
//!
//! Both stores are plain values meant to be owned by the application state
//! and shared behind an `Arc`; neither relies on process-wide globals.

pub mod error;
pub mod history;
pub mod ip;
pub mod limiter;
pub mod policy;

pub use error::{RateLimited, Result, SessionError};
pub use history::{HistoryStore, HistoryStoreBuilder};
pub use ip::normalize_ip;
pub use limiter::{FixedWindowLimiter, LimitScope, RateStatus, WindowPolicy};
pub use policy::RateLimiter;

/// A chat turn as stored in history buffers
pub type ChatTurn = persona_llm::Message;
