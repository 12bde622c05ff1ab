//! Per-agent state tracking
//!
//! Each agent owns one [`StateTracker`]. An invocation holds a [`WorkGuard`]
//! for its whole duration; dropping the guard returns the agent to idle,
//! so a cancelled or timed-out call never leaves it marked `working`.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use super::task::Task;

/// Lifecycle status of an agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Ready for the next task
    #[default]
    Idle,
    /// Inside an invocation
    Working,
    /// Last invocation returned an error to its caller
    Error,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Working => write!(f, "working"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of an agent's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub name: String,
    pub status: AgentStatus,
    pub current_task: Option<Task>,
    #[serde(default)]
    pub memory: HashMap<String, serde_json::Value>,
}

impl AgentState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AgentStatus::Idle,
            current_task: None,
            memory: HashMap::new(),
        }
    }
}

/// Thread-safe holder of an [`AgentState`]
#[derive(Debug)]
pub struct StateTracker {
    state: RwLock<AgentState>,
}

impl StateTracker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(AgentState::new(name)),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AgentState {
        self.read().clone()
    }

    pub fn status(&self) -> AgentStatus {
        self.read().status
    }

    /// Mark the agent working on `task` until the returned guard is dropped
    pub fn begin(&self, task: &Task) -> WorkGuard<'_> {
        {
            let mut state = self.write();
            state.status = AgentStatus::Working;
            state.current_task = Some(task.clone());
        }
        WorkGuard {
            tracker: self,
            failed: false,
        }
    }

    /// Store a value in the agent's memory
    pub fn remember(&self, key: impl Into<String>, value: serde_json::Value) {
        self.write().memory.insert(key.into(), value);
    }

    pub fn recall(&self, key: &str) -> Option<serde_json::Value> {
        self.read().memory.get(key).cloned()
    }

    fn finish(&self, status: AgentStatus) {
        let mut state = self.write();
        state.status = status;
        state.current_task = None;
    }

    // A panic while holding the lock leaves plain data behind; keep using it.
    fn read(&self) -> RwLockReadGuard<'_, AgentState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AgentState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Guard for one in-flight invocation
///
/// Resets the agent to idle (or error, see [`WorkGuard::fail`]) when dropped.
#[derive(Debug)]
pub struct WorkGuard<'a> {
    tracker: &'a StateTracker,
    failed: bool,
}

impl WorkGuard<'_> {
    /// Leave the agent in the error state instead of idle
    pub fn fail(mut self) {
        self.failed = true;
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        let status = if self.failed {
            AgentStatus::Error
        } else {
            AgentStatus::Idle
        };
        self.tracker.finish(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_idle() {
        let tracker = StateTracker::new("researcher");
        let state = tracker.snapshot();
        assert_eq!(state.name, "researcher");
        assert_eq!(state.status, AgentStatus::Idle);
        assert!(state.current_task.is_none());
    }

    #[test]
    fn test_guard_marks_working_then_idle() {
        let tracker = StateTracker::new("a");
        let task = Task::new("t");

        {
            let _guard = tracker.begin(&task);
            let state = tracker.snapshot();
            assert_eq!(state.status, AgentStatus::Working);
            assert_eq!(state.current_task, Some(task.clone()));
        }

        let state = tracker.snapshot();
        assert_eq!(state.status, AgentStatus::Idle);
        assert!(state.current_task.is_none());
    }

    #[test]
    fn test_failed_guard_leaves_error() {
        let tracker = StateTracker::new("a");
        tracker.begin(&Task::new("t")).fail();

        assert_eq!(tracker.status(), AgentStatus::Error);
        assert!(tracker.snapshot().current_task.is_none());

        drop(tracker.begin(&Task::new("again")));
        assert_eq!(tracker.status(), AgentStatus::Idle);
    }

    #[test]
    fn test_memory() {
        let tracker = StateTracker::new("a");
        tracker.remember("last_confidence", serde_json::json!(0.85));
        assert_eq!(tracker.recall("last_confidence"), Some(serde_json::json!(0.85)));
        assert_eq!(tracker.recall("missing"), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(AgentStatus::Idle.to_string(), "idle");
        assert_eq!(AgentStatus::Working.to_string(), "working");
        assert_eq!(AgentStatus::Error.to_string(), "error");
    }
}
