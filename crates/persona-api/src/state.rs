use std::sync::Arc;
use std::time::Duration;

use persona_context::{ContextStrategy, HistoryContextStrategy};
use persona_llm::{ChatClient, ChatOptions};
use persona_session::{HistoryStore, RateLimiter, WindowPolicy};

use crate::config::{Config, WindowConfig};
use crate::error::{ApiError, ApiResult};
use crate::persona::Personas;

/// Shared application state passed to all handlers
///
/// The history store and rate limiter are owned here rather than living in
/// globals; each guards its own per-key critical sections.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub personas: Arc<Personas>,
    pub llm_client: Arc<dyn ChatClient>,
    pub history: Arc<HistoryStore>,
    pub context: Arc<dyn ContextStrategy>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        config: Config,
        personas: Personas,
        llm_client: Arc<dyn ChatClient>,
    ) -> ApiResult<Self> {
        let history = Arc::new(
            HistoryStore::builder()
                .max_turns(config.history.max_turns)
                .max_sessions(config.history.max_sessions)
                .idle_ttl(Duration::from_secs(config.history.idle_ttl_secs))
                .build()
                .map_err(|e| ApiError::Config(e.to_string()))?,
        );

        let rate_limiter = RateLimiter::new(
            window_policy(&config.rate_limit.ip)?,
            window_policy(&config.rate_limit.session)?,
        )
        .with_max_keys(config.rate_limit.max_keys);

        Ok(Self {
            context: Arc::new(HistoryContextStrategy::new(Arc::clone(&history))),
            config: Arc::new(config),
            personas: Arc::new(personas),
            llm_client,
            history,
            rate_limiter: Arc::new(rate_limiter),
        })
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions::from(&self.config.llm)
    }

    /// How long a chat request may wait on the completion call
    pub fn completion_timeout(&self) -> Duration {
        let request_secs = self.config.server.request_timeout_secs;
        let llm_secs = self.config.llm.timeout_secs.unwrap_or(request_secs);
        Duration::from_secs(llm_secs.min(request_secs).max(1))
    }
}

fn window_policy(config: &WindowConfig) -> ApiResult<WindowPolicy> {
    WindowPolicy::new(config.max_requests, Duration::from_secs(config.window_secs))
        .map_err(|e| ApiError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Persona;
    use persona_llm::{ChatRequest, ChatResponse};

    struct NoopClient;

    #[async_trait::async_trait]
    impl ChatClient for NoopClient {
        async fn chat(&self, _request: ChatRequest) -> anyhow::Result<ChatResponse> {
            Ok(ChatResponse::text(""))
        }
    }

    fn state(tweak: impl FnOnce(&mut Config)) -> AppState {
        let mut config = Config::default();
        tweak(&mut config);
        let personas = Personas::new(Persona::new("A", "a"), Persona::new("B", "b"));
        AppState::new(config, personas, Arc::new(NoopClient)).unwrap()
    }

    #[test]
    fn test_completion_timeout_defaults_to_llm_setting() {
        assert_eq!(state(|_| {}).completion_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_completion_timeout_capped_by_request_timeout() {
        let state = state(|config| config.server.request_timeout_secs = 30);
        assert_eq!(state.completion_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_completion_timeout_without_llm_setting() {
        let state = state(|config| config.llm.timeout_secs = None);
        assert_eq!(state.completion_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_invalid_window_is_config_error() {
        let mut config = Config::default();
        config.rate_limit.session.max_requests = 0;
        let personas = Personas::new(Persona::new("A", "a"), Persona::new("B", "b"));

        let result = AppState::new(config, personas, Arc::new(NoopClient));
        assert!(matches!(result, Err(ApiError::Config(_))));
    }
}
