//! Text-completion provider abstraction for the finance assistant
//!
//! This crate provides provider-agnostic abstractions for talking to a
//! chat-style completion service. It includes:
//!
//! - Message types for conversation history
//! - Completion request/response types, including the response style
//!   (plain text or a JSON object)
//! - The [`LLMProvider`] trait the rest of the workspace is written against
//! - An OpenAI-compatible provider (`providers::OpenAIProvider`)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;

// Re-export main types
pub use completion::{
    CompletionRequest, CompletionResponse, ResponseFormat, StopReason, TokenUsage,
};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
