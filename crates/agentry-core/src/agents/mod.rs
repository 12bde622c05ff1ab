//! Agent system - research and planning agents
//!
//! Both roles share one invocation pipeline: validate the task, render the
//! role's prompt, call the model, and parse the response into sections.
//! What differs per role is data ([`RoleProfile`]) plus the mapping from
//! sections to a typed payload.

pub mod planner;
pub mod prompt;
pub mod research;
pub mod sections;
pub mod state;
pub mod task;
pub mod traits;

mod runner;

use serde::{Deserialize, Serialize};

pub use planner::PlanningAgent;
pub use prompt::RoleProfile;
pub use research::ResearchAgent;
pub use sections::{NO_CONTENT, SectionParser, Sections};
pub use state::{AgentState, AgentStatus, StateTracker, WorkGuard};
pub use task::{ResearchContext, Task};
pub use traits::{
    Agent, AgentResult, FailurePolicy, Payload, PlanningPayload, ProcessFuture, ResearchPayload,
};

/// Agent roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Research,
    Planning,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Research => write!(f, "research"),
            Self::Planning => write!(f, "planning"),
        }
    }
}
