//! Bounded conversation history
//!
//! Owned exclusively by the orchestrator. Grows monotonically within a
//! session except across `/clear`; when the window overflows, the oldest
//! messages are dropped and the caller is told how many so it can emit a
//! memory-layer event.

use telos_llm::Message;

/// Default maximum number of messages kept in the window
const DEFAULT_MAX_MESSAGES: usize = 50;

/// An ordered, bounded conversation
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    max_messages: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create an empty conversation with the default window
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }

    /// Create with a custom window size
    #[must_use]
    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: max_messages.max(2),
        }
    }

    /// Append a user turn. Returns the number of old messages dropped.
    pub fn add_user(&mut self, content: impl Into<String>) -> usize {
        self.messages.push(Message::user(content));
        self.trim()
    }

    /// Append an assistant turn. Returns the number of old messages dropped.
    pub fn add_assistant(&mut self, content: impl Into<String>) -> usize {
        self.messages.push(Message::assistant(content));
        self.trim()
    }

    /// Append a tool result turn. Returns the number of old messages dropped.
    pub fn add_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> usize {
        self.messages.push(Message::tool_response(tool_call_id, content));
        self.trim()
    }

    /// The messages, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages with a system prompt prepended
    #[must_use]
    pub fn messages_with_system(&self, system_prompt: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(system_prompt)];
        messages.extend(self.messages.iter().cloned());
        messages
    }

    /// Number of messages in the window
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Truncate the history (the `/clear` command)
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn trim(&mut self) -> usize {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(0..excess);
            excess
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telos_llm::MessageRole;

    #[test]
    fn test_append_and_clear() {
        let mut conv = Conversation::new();
        conv.add_user("Hello");
        conv.add_assistant("Hi there");
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0].role, MessageRole::User);

        conv.clear();
        assert!(conv.is_empty());
    }

    #[test]
    fn test_trim_reports_dropped() {
        let mut conv = Conversation::with_max_messages(3);
        assert_eq!(conv.add_user("1"), 0);
        assert_eq!(conv.add_assistant("2"), 0);
        assert_eq!(conv.add_user("3"), 0);
        // Fourth message pushes the first out
        assert_eq!(conv.add_assistant("4"), 1);
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[0].content, "2");
    }

    #[test]
    fn test_messages_with_system() {
        let mut conv = Conversation::new();
        conv.add_user("question");
        let messages = conv.messages_with_system("be brief");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
    }
}
