//! Scripted LLM client for tests
//!
//! Returns canned responses in order, so multi-turn agent behavior can be
//! driven deterministically without a transport.

use crate::client::{LlmClient, SharedUsageHook};
use crate::completion::{ChatRequest, ChatResponse, TokenUsage};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A deterministic client that pops pre-loaded responses in FIFO order.
///
/// When the script runs dry it returns a fixed fallback answer rather than
/// erroring, so tests that only care about earlier turns stay simple.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    usage_hook: Mutex<Option<SharedUsageHook>>,
    usage_per_call: Option<TokenUsage>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    /// Create an empty script (every call returns the fallback)
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: "ok".to_string(),
            usage_hook: Mutex::new(None),
            usage_per_call: None,
        }
    }

    /// Queue a successful response
    #[must_use]
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(content.into()));
        self
    }

    /// Queue an error
    #[must_use]
    pub fn with_error(self, error: Error) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
        self
    }

    /// Set the fallback answer used once the script is exhausted
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Report a fixed usage after every call
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage_per_call = Some(usage);
        self
    }

    /// Number of responses still queued
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        let content = match next {
            Some(Ok(content)) => content,
            Some(Err(e)) => return Err(e),
            None => self.fallback.clone(),
        };

        if let Some(usage) = self.usage_per_call {
            let hook = self
                .usage_hook
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
            if let Some(hook) = hook {
                hook.on_usage(usage);
            }
        }

        Ok(ChatResponse {
            content,
            usage: self.usage_per_call,
            finish_reason: Some("stop".to_string()),
            model: "scripted-model".to_string(),
        })
    }

    fn set_usage_hook(&self, hook: SharedUsageHook) {
        *self.usage_hook.lock().unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn test_scripted_order() {
        let client = ScriptedClient::new()
            .with_response("first")
            .with_response("second");

        let req = ChatRequest::new(vec![Message::user("hi")]);
        assert_eq!(client.chat(req.clone()).await.unwrap().content, "first");
        assert_eq!(client.chat(req.clone()).await.unwrap().content, "second");
        // Exhausted script falls back
        assert_eq!(client.chat(req).await.unwrap().content, "ok");
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let client = ScriptedClient::new().with_error(Error::RateLimit);
        let req = ChatRequest::new(vec![Message::user("hi")]);
        assert!(matches!(client.chat(req).await, Err(Error::RateLimit)));
    }

    #[tokio::test]
    async fn test_default_streaming_single_delta() {
        let client = ScriptedClient::new().with_response("streamed");
        let req = ChatRequest::new(vec![Message::user("hi")]);
        let mut rx = client.chat_streaming(req).await.unwrap();
        let delta = rx.recv().await.unwrap();
        assert_eq!(delta.delta, "streamed");
        assert!(delta.is_final);
    }
}
