use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::AppState;

/// Periodically drop idle sessions and elapsed rate-limit windows
pub fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.rate_limit.sweep_interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            sweep(&state);
        }
    })
}

/// One sweep pass; returns (sessions, windows) removed
pub fn sweep(state: &AppState) -> (usize, usize) {
    let sessions = state.history.evict_idle();
    let windows = state.rate_limiter.evict_expired();

    tracing::debug!(
        sessions_evicted = sessions,
        windows_evicted = windows,
        sessions_live = state.history.len(),
        "Swept idle state"
    );

    (sessions, windows)
}
