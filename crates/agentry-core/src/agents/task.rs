//! Task model submitted to agents

use serde::{Deserialize, Serialize};

use super::traits::ResearchPayload;

/// Research findings handed to the planning phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchContext {
    pub summary: String,
    pub detailed_analysis: String,
    pub recommendations: String,
    pub considerations: String,
}

impl ResearchContext {
    /// True when every field is blank
    pub fn is_empty(&self) -> bool {
        [
            &self.summary,
            &self.detailed_analysis,
            &self.recommendations,
            &self.considerations,
        ]
        .iter()
        .all(|f| f.trim().is_empty())
    }
}

impl From<&ResearchPayload> for ResearchContext {
    fn from(payload: &ResearchPayload) -> Self {
        Self {
            summary: payload.summary.clone(),
            detailed_analysis: payload.detailed_analysis.clone(),
            recommendations: payload.recommendations.clone(),
            considerations: payload.considerations.clone(),
        }
    }
}

/// A unit of work for the pipeline
///
/// Only `description` is required. Unknown fields round-trip through
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    /// Set only on tasks derived for the planning phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_results: Option<ResearchContext>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Derive a planning task carrying `research`, leaving `self` untouched
    pub fn with_research_results(&self, research: ResearchContext) -> Self {
        Self {
            research_results: Some(research),
            ..self.clone()
        }
    }

    /// Whether the description is present after trimming
    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }

    /// Whether non-empty research results are attached
    pub fn has_research_results(&self) -> bool {
        self.research_results.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Human-readable rendering of the task fields
    pub fn format_details(&self) -> String {
        let mut parts = vec![format!("Description: {}", self.description)];

        if let Some(priority) = &self.priority {
            parts.push(format!("Priority: {}", priority.to_uppercase()));
        }
        if let Some(deadline) = &self.deadline {
            parts.push(format!("Deadline: {}", deadline));
        }
        if !self.requirements.is_empty() {
            parts.push("Requirements:".to_string());
            parts.extend(self.requirements.iter().map(|r| format!("- {}", r)));
        }

        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_from_minimal_json() {
        let task: Task = serde_json::from_value(json!({"description": "Build a cache"})).unwrap();
        assert_eq!(task.description, "Build a cache");
        assert!(task.priority.is_none());
        assert!(task.requirements.is_empty());
        assert!(task.research_results.is_none());
    }

    #[test]
    fn test_missing_description_deserializes_empty() {
        let task: Task = serde_json::from_value(json!({"priority": "high"})).unwrap();
        assert!(!task.has_description());
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let value = json!({"description": "d", "owner": "ops", "budget": 3});
        let task: Task = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(task.extra["owner"], "ops");
        assert_eq!(serde_json::to_value(&task).unwrap(), value);
    }

    #[test]
    fn test_with_research_results_does_not_mutate_source() {
        let task = Task::new("Plan a migration").with_priority("high");
        let research = ResearchContext {
            summary: "s".into(),
            ..ResearchContext::default()
        };

        let planning = task.with_research_results(research.clone());

        assert!(task.research_results.is_none());
        assert_eq!(planning.research_results, Some(research));
        assert_eq!(planning.priority.as_deref(), Some("high"));
        assert!(planning.has_research_results());
    }

    #[test]
    fn test_blank_research_counts_as_missing() {
        let task = Task::new("d").with_research_results(ResearchContext {
            summary: "  ".into(),
            ..ResearchContext::default()
        });
        assert!(!task.has_research_results());
    }

    #[test]
    fn test_format_details() {
        let task = Task::new("Ship the API")
            .with_priority("high")
            .with_deadline("2025-01-01")
            .with_requirement("REST")
            .with_requirement("Auth");

        assert_eq!(
            task.format_details(),
            "Description: Ship the API\nPriority: HIGH\nDeadline: 2025-01-01\nRequirements:\n- REST\n- Auth"
        );
    }

    #[test]
    fn test_format_details_description_only() {
        assert_eq!(Task::new("x").format_details(), "Description: x");
    }
}
