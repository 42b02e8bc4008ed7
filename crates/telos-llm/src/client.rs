//! LLM client trait definition

use crate::completion::{ChatRequest, ChatResponse, TokenUsage};
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A streamed chunk of assistant output.
#[derive(Debug, Clone)]
pub struct ChatDelta {
    /// Text fragment
    pub delta: String,
    /// Whether this is the final fragment
    pub is_final: bool,
}

/// Callback invoked with token usage after each completed call.
pub trait UsageHook: Send + Sync {
    /// Report usage for one completed LLM call.
    fn on_usage(&self, usage: TokenUsage);
}

/// Shared usage hook handle
pub type SharedUsageHook = Arc<dyn UsageHook>;

/// Trait for LLM clients
///
/// Transports implement this; the agent core only ever talks through it.
/// Implementations must honor `force_json` when set, and must abort promptly
/// when the calling future is dropped (the core races calls against
/// cancellation tokens and timeouts).
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the client name (for logging)
    fn name(&self) -> &str;

    /// Get the model identifier used for requests
    fn model(&self) -> &str;

    /// Complete a conversation and return the full response
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Complete a conversation, streaming deltas into the returned receiver.
    ///
    /// The default implementation performs a non-streaming call and emits a
    /// single final delta, which is sufficient for transports without a
    /// streaming API.
    async fn chat_streaming(&self, request: ChatRequest) -> Result<mpsc::Receiver<ChatDelta>> {
        let response = self.chat(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(ChatDelta {
                delta: response.content,
                is_final: true,
            })
            .await;
        Ok(rx)
    }

    /// Install a usage hook invoked after each completed call.
    ///
    /// Default is a no-op for clients that do not report usage.
    fn set_usage_hook(&self, _hook: SharedUsageHook) {}
}
