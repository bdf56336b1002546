use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::{Result, SessionError};
use crate::ChatTurn;

pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

/// Bounded FIFO of turns for one session
#[derive(Debug)]
struct SessionHistory {
    turns: VecDeque<ChatTurn>,
    last_access: Instant,
}

impl SessionHistory {
    fn new(now: Instant) -> Self {
        Self {
            turns: VecDeque::new(),
            last_access: now,
        }
    }

    fn push(&mut self, turn: ChatTurn, max_turns: usize) {
        self.turns.push_back(turn);
        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }
    }

    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_access) > ttl
    }
}

/// Per-session rolling conversation history
///
/// Each session keeps at most `max_turns` turns, oldest evicted first. The
/// system prompt is never stored here. Sessions idle longer than `idle_ttl`
/// are dropped by [`HistoryStore::evict_idle`], and once `max_sessions`
/// buffers exist the least recently used one makes room for a new session.
///
/// Every read-modify-write on a session runs under that session's map
/// entry, so concurrent requests for the same session never lose an append.
#[derive(Debug)]
pub struct HistoryStore {
    sessions: DashMap<String, SessionHistory>,
    max_turns: usize,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl HistoryStore {
    /// Store with default limits (10 turns, 10k sessions, 1h idle)
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns: DEFAULT_MAX_TURNS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }

    pub fn builder() -> HistoryStoreBuilder {
        HistoryStoreBuilder::new()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Current turns for a session, oldest first
    ///
    /// An unknown session gets an empty buffer created for it.
    pub fn get(&self, session_id: &str) -> Vec<ChatTurn> {
        self.get_at(session_id, Instant::now())
    }

    pub fn get_at(&self, session_id: &str, now: Instant) -> Vec<ChatTurn> {
        self.with_session(session_id, now, |history| history.turns.iter().cloned().collect())
    }

    /// Append one turn, trimming from the front past `max_turns`
    pub fn append(&self, session_id: &str, turn: ChatTurn) {
        self.append_at(session_id, turn, Instant::now())
    }

    pub fn append_at(&self, session_id: &str, turn: ChatTurn, now: Instant) {
        let max_turns = self.max_turns;
        self.with_session(session_id, now, |history| history.push(turn, max_turns));
    }

    /// Append a user turn and its reply as one step
    ///
    /// The pair lands contiguously even when other requests for the same
    /// session complete at the same time.
    pub fn append_exchange(&self, session_id: &str, user: ChatTurn, reply: ChatTurn) {
        self.append_exchange_at(session_id, user, reply, Instant::now())
    }

    pub fn append_exchange_at(&self, session_id: &str, user: ChatTurn, reply: ChatTurn, now: Instant) {
        let max_turns = self.max_turns;
        self.with_session(session_id, now, |history| {
            history.push(user, max_turns);
            history.push(reply, max_turns);
        });
    }

    /// Drop sessions idle for longer than the TTL, returning how many went
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, history| !history.is_idle(now, ttl));
        before.saturating_sub(self.sessions.len())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of tracked sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn with_session<R>(
        &self,
        session_id: &str,
        now: Instant,
        f: impl FnOnce(&mut SessionHistory) -> R,
    ) -> R {
        if !self.sessions.contains_key(session_id) {
            self.make_room(now);
        }

        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionHistory::new(now));
        entry.last_access = now;
        f(entry.value_mut())
    }

    /// Free a slot for a new session once the store is full
    ///
    /// Must not be called while holding a map entry.
    fn make_room(&self, now: Instant) {
        if self.sessions.len() < self.max_sessions {
            return;
        }

        let evicted = self.evict_idle_at(now);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle sessions to make room");
        }
        if self.sessions.len() < self.max_sessions {
            return;
        }

        let lru = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_access)
            .map(|entry| entry.key().clone());

        if let Some(session_id) = lru {
            self.sessions.remove(&session_id);
            tracing::debug!(session_id = %session_id, "Evicted least recently used session");
        }
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HistoryStoreBuilder {
    max_turns: usize,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl HistoryStoreBuilder {
    pub fn new() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }

    pub fn max_turns(mut self, turns: usize) -> Self {
        self.max_turns = turns;
        self
    }

    pub fn max_sessions(mut self, sessions: usize) -> Self {
        self.max_sessions = sessions;
        self
    }

    pub fn idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<HistoryStore> {
        if self.max_turns == 0 {
            return Err(SessionError::InvalidConfig("max_turns must be at least 1".to_string()));
        }
        if self.max_sessions == 0 {
            return Err(SessionError::InvalidConfig("max_sessions must be at least 1".to_string()));
        }

        Ok(HistoryStore {
            sessions: DashMap::new(),
            max_turns: self.max_turns,
            max_sessions: self.max_sessions,
            idle_ttl: self.idle_ttl,
        })
    }
}

impl Default for HistoryStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
