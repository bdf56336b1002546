use std::sync::Arc;

use persona_session::HistoryStore;

use crate::strategy::{ContextStrategy, ContextWindow};

/// Prompt built from the persona prompt plus the session's rolling history
pub struct HistoryContextStrategy {
    history: Arc<HistoryStore>,
}

impl HistoryContextStrategy {
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self { history }
    }
}

impl ContextStrategy for HistoryContextStrategy {
    fn context_window(&self, system_prompt: &str, session_id: &str) -> ContextWindow {
        ContextWindow {
            system_prompt: system_prompt.to_string(),
            history: self.history.get(session_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_llm::Message;

    fn strategy() -> (Arc<HistoryStore>, HistoryContextStrategy) {
        let store = Arc::new(HistoryStore::new());
        (Arc::clone(&store), HistoryContextStrategy::new(store))
    }

    #[test]
    fn test_new_session_prompt() {
        let (_, strategy) = strategy();

        let messages = strategy.build("You are A", "s1", "hi");
        assert_eq!(messages, vec![Message::system("You are A"), Message::human("hi")]);
    }

    #[test]
    fn test_history_between_system_and_user() {
        let (store, strategy) = strategy();
        store.append_exchange("s1", Message::human("hi"), Message::ai("hello"));

        let messages = strategy.build("You are A", "s1", "how are you?");
        assert_eq!(
            messages,
            vec![
                Message::system("You are A"),
                Message::human("hi"),
                Message::ai("hello"),
                Message::human("how are you?"),
            ]
        );
    }

    #[test]
    fn test_build_does_not_persist() {
        let (store, strategy) = strategy();

        strategy.build("You are A", "s1", "hi");
        strategy.build("You are B", "s1", "hi again");

        assert!(store.get("s1").is_empty());
    }

    #[test]
    fn test_switching_persona_keeps_history() {
        let (store, strategy) = strategy();
        store.append_exchange("s1", Message::human("hi"), Message::ai("hello"));

        let a = strategy.build("You are A", "s1", "next");
        let b = strategy.build("You are B", "s1", "next");

        assert_eq!(a[0], Message::system("You are A"));
        assert_eq!(b[0], Message::system("You are B"));
        assert_eq!(a[1..], b[1..]);
    }

    #[test]
    fn test_build_is_repeatable() {
        let (store, strategy) = strategy();
        store.append("s1", Message::human("earlier"));

        assert_eq!(
            strategy.build("You are A", "s1", "x"),
            strategy.build("You are A", "s1", "x")
        );
    }
}
