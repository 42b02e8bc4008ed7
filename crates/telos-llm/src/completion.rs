//! Completion request and response types

use crate::message::Message;
use crate::tools::ToolManifestEntry;
use serde::{Deserialize, Serialize};

/// Token usage information
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Sum two usage reports
    #[must_use]
    pub fn merged(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

/// Chat request
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Tools the model may call (empty for text-only turns)
    pub tools: Vec<ToolManifestEntry>,
    /// Require the model to answer with a single JSON object
    pub force_json: bool,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a request from messages
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Add a message
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Expose tools to the model
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolManifestEntry>) -> Self {
        self.tools = tools;
        self
    }

    /// Require a JSON-object answer
    #[must_use]
    pub fn with_force_json(mut self, force: bool) -> Self {
        self.force_json = force;
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated content
    pub content: String,
    /// Token usage, when the transport reports it
    pub usage: Option<TokenUsage>,
    /// Finish reason
    pub finish_reason: Option<String>,
    /// Model that produced the response
    pub model: String,
}

impl ChatResponse {
    /// A plain text response with no usage data (used by tests and fallbacks)
    #[must_use]
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: model.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_builder() {
        let request = ChatRequest::new(vec![Message::system("plan things")])
            .with_message(Message::user("Hello"))
            .with_force_json(true)
            .with_max_tokens(100)
            .with_temperature(0.2);

        assert_eq!(request.messages.len(), 2);
        assert!(request.force_json);
        assert_eq!(request.max_tokens, Some(100));
    }

    #[test]
    fn test_token_usage_merged() {
        let a = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        let b = TokenUsage {
            prompt_tokens: 3,
            completion_tokens: 2,
            total_tokens: 5,
        };
        assert_eq!(a.merged(b).total_tokens, 20);
    }
}
