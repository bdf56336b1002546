use persona_llm::Message;

/// Prompt pieces gathered before a completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    pub system_prompt: String,
    pub history: Vec<Message>,
}

impl ContextWindow {
    /// System turn, then history, then the new user turn
    pub fn into_messages(self, user_message: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.system_prompt));
        messages.extend(self.history);
        messages.push(Message::human(user_message));
        messages
    }
}

/// Strategy for building the outbound prompt of a conversation
pub trait ContextStrategy: Send + Sync {
    /// Context for a session, as stored before the new message is recorded
    fn context_window(&self, system_prompt: &str, session_id: &str) -> ContextWindow;

    /// Full message list handed to the completion call
    ///
    /// Nothing built here is persisted.
    fn build(&self, system_prompt: &str, session_id: &str, user_message: &str) -> Vec<Message> {
        self.context_window(system_prompt, session_id)
            .into_messages(user_message)
    }
}
