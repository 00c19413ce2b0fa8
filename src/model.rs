//! Message types and streaming events.
//!
//! These are the values that travel through the provider seam: callers hand a
//! provider a [`Context`](crate::provider::Context) of [`Message`]s and receive a
//! stream of [`StreamEvent`]s back. The parameter-injection layer never looks
//! inside them; it only forwards them untouched.

use serde::{Deserialize, Serialize};

// ============================================================================
// Message Types
// ============================================================================

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Message {
    /// Message authored by the user.
    User(UserMessage),
    /// Message authored by the assistant/model.
    Assistant(AssistantMessage),
}

/// A user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub content: String,
    pub timestamp: i64,
}

/// An assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    pub content: Vec<ContentBlock>,
    pub api: String,
    pub provider: String,
    pub model: String,
    pub usage: Usage,
    pub stop_reason: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: i64,
}

impl Message {
    /// Convenience constructor for a plain-text user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(UserMessage {
            content: content.into(),
            timestamp: 0,
        })
    }
}

// ============================================================================
// Stop Reasons
// ============================================================================

/// Why a response ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    #[default]
    /// The provider signaled a normal stop (end of message).
    Stop,
    /// The provider hit a token limit.
    Length,
    /// The provider requested tool execution.
    ToolUse,
    /// The stream terminated due to an error.
    Error,
    /// The request was aborted locally.
    Aborted,
}

// ============================================================================
// Content Blocks
// ============================================================================

/// A block of assistant output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    Text(TextContent),
}

/// Plain text output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

// ============================================================================
// Usage
// ============================================================================

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub total_tokens: u64,
}

// ============================================================================
// Streaming Events
// ============================================================================

/// Streaming event from a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Start {
        partial: AssistantMessage,
    },
    TextDelta {
        content_index: usize,
        delta: String,
    },
    Done {
        reason: StopReason,
        message: AssistantMessage,
    },
    Error {
        reason: StopReason,
        error: AssistantMessage,
    },
}
