//! Agent trait and result types

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AgentRole;
use super::state::AgentState;
use super::task::Task;
use crate::error::Result;

/// Structured research findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPayload {
    pub summary: String,
    pub detailed_analysis: String,
    pub recommendations: String,
    pub considerations: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Structured implementation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningPayload {
    pub plan: String,
    pub technical_specifications: String,
    pub timeline: String,
    pub resources: String,
    pub risks_and_mitigations: String,
    pub confidence: f64,
}

/// Output of a completed invocation, by role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Research(ResearchPayload),
    Planning(PlanningPayload),
}

impl Payload {
    pub fn role(&self) -> AgentRole {
        match self {
            Self::Research(_) => AgentRole::Research,
            Self::Planning(_) => AgentRole::Planning,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Self::Research(r) => r.confidence,
            Self::Planning(p) => p.confidence,
        }
    }
}

/// Outcome of one agent invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentResult {
    Completed {
        payload: Payload,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl AgentResult {
    pub fn completed(payload: Payload) -> Self {
        Self::Completed { payload }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Completed { payload } => Some(payload),
            Self::Error { .. } => None,
        }
    }

    pub fn research(&self) -> Option<&ResearchPayload> {
        match self.payload()? {
            Payload::Research(r) => Some(r),
            Payload::Planning(_) => None,
        }
    }

    pub fn planning(&self) -> Option<&PlanningPayload> {
        match self.payload()? {
            Payload::Planning(p) => Some(p),
            Payload::Research(_) => None,
        }
    }

    /// Error message, `None` when completed
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            Self::Completed { .. } => None,
        }
    }
}

/// What an agent does with a failed model call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure as an [`AgentResult::Error`]
    #[default]
    Wrap,
    /// Return the error to the caller and leave the agent in the error state
    Propagate,
}

/// Boxed future returned by [`Agent::process`]
pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = Result<AgentResult>> + Send + 'a>>;

/// A role-specific LLM worker
///
/// `process` never mutates the task. Precondition failures are returned
/// as `Ok(AgentResult::Error)` without calling the model.
pub trait Agent: Send + Sync {
    /// Unique name used for registration and merge ordering
    fn name(&self) -> &str;

    fn role(&self) -> AgentRole;

    /// Snapshot of the agent's current state
    fn state(&self) -> AgentState;

    /// Run the agent on a task
    fn process<'a>(&'a self, task: &'a Task) -> ProcessFuture<'a>;
}
