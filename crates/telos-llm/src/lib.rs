//! Telos LLM - Client Contract
//!
//! This crate defines the LLM surface the Telos agent core consumes:
//! - Message: conversation message types
//! - Completion: request/response types with force-JSON and streaming variants
//! - Tools: function-calling definitions and calls
//! - Client: the `LlmClient` trait every transport implements
//! - Scripted: a deterministic client for driving tests
//!
//! Transports (HTTP providers, local runtimes) live outside this workspace;
//! they implement `LlmClient` and are injected at construction time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod completion;
pub mod error;
pub mod message;
pub mod scripted;
pub mod tools;

pub use client::{ChatDelta, LlmClient, SharedUsageHook, UsageHook};
pub use completion::{ChatRequest, ChatResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use scripted::ScriptedClient;
pub use tools::{ToolCallRequest, ToolManifestEntry};
