//! LLM integration
//!
//! This module provides:
//! - The [`LanguageModel`] capability agents are written against
//! - An OpenAI-compatible HTTP client implementing it
//! - Request/response types for chat completions

mod client;
mod model;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use model::{GenerateFuture, LanguageModel};
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, Generation, Message, MessageRole, Usage,
};
