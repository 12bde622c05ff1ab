//! Agentry Core Library
//!
//! This crate provides the core functionality for Agentry, including:
//! - Task model and response-section parsing
//! - Agents (research, planning) over a pluggable language model
//! - Coordination (sequential pipeline and deadline-bound fan-out)
//! - Self-reflection and adaptive learning
//! - LLM integration (OpenAI-compatible API, Groq by default)
//! - Cost monitoring and per-run task metrics
//! - Result persistence

pub mod agents;
pub mod config;
pub mod coordinator;
pub mod cost;
pub mod error;
pub mod format;
pub mod learning;
pub mod llm;
pub mod metrics;
pub mod reflection;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agents::{
        Agent, AgentResult, AgentRole, FailurePolicy, PlanningAgent, ResearchAgent,
        ResearchContext, RoleProfile, Task,
    };
    pub use crate::config::Config;
    pub use crate::coordinator::{CombinedResult, TaskManager, TaskReport};
    pub use crate::error::{Error, Result};
    pub use crate::llm::{LanguageModel, LlmClient};
    pub use crate::metrics::TaskMetrics;
    pub use crate::reflection::Reflector;
}
