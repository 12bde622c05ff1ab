//! Planning agent - turns research findings into an implementation plan

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::AgentRole;
use super::prompt::RoleProfile;
use super::runner::AgentCore;
use super::state::AgentState;
use super::task::{ResearchContext, Task};
use super::traits::{Agent, AgentResult, FailurePolicy, Payload, PlanningPayload, ProcessFuture};
use crate::error::Result;
use crate::learning::LearningStore;
use crate::llm::LanguageModel;
use crate::reflection::{PerformanceMetrics, ReflectionLog, Reflector};

/// Name given to a planning agent by [`PlanningAgent::new`]
pub const DEFAULT_PLANNING_AGENT_NAME: &str = "planner";

/// Planning agent
///
/// Requires a task carrying non-empty `research_results`, normally derived
/// by the coordinator from a completed research phase.
pub struct PlanningAgent {
    core: AgentCore,
}

impl PlanningAgent {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self::named(DEFAULT_PLANNING_AGENT_NAME, llm)
    }

    pub fn named(name: impl Into<String>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            core: AgentCore::new(name.into(), RoleProfile::planning(), llm),
        }
    }

    pub fn with_profile(mut self, profile: RoleProfile) -> Self {
        self.core.set_profile(profile);
        self
    }

    pub fn with_reflection(mut self, reflector: Reflector) -> Self {
        self.core.set_reflector(reflector);
        self
    }

    pub fn with_learning(mut self, store: Arc<Mutex<LearningStore>>) -> Self {
        self.core.set_learning(store);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.core.set_policy(policy);
        self
    }

    pub fn profile(&self) -> &RoleProfile {
        self.core.profile()
    }

    pub fn reflection_metrics(&self) -> Option<PerformanceMetrics> {
        self.core.reflection_metrics()
    }

    pub fn reflections(&self) -> Vec<ReflectionLog> {
        self.core.reflections()
    }

    async fn plan(&self, task: &Task) -> Result<AgentResult> {
        if !task.has_description() {
            return Ok(self.core.reject("description"));
        }
        let Some(research) = task
            .research_results
            .as_ref()
            .filter(|_| task.has_research_results())
        else {
            return Ok(self.core.reject("research_results"));
        };

        self.core
            .run(task, planning_vars(task, research), |sections, confidence| {
                Payload::Planning(PlanningPayload {
                    plan: sections.content("IMPLEMENTATION_PLAN"),
                    technical_specifications: sections.content("TECHNICAL_SPECIFICATIONS"),
                    timeline: sections.content("TIMELINE"),
                    resources: sections.content("RESOURCES"),
                    risks_and_mitigations: sections.content("RISKS_AND_MITIGATIONS"),
                    confidence,
                })
            })
            .await
    }
}

fn planning_vars(task: &Task, research: &ResearchContext) -> HashMap<&'static str, String> {
    HashMap::from([
        ("description", task.description.clone()),
        ("task_details", task.format_details()),
        ("summary", research.summary.clone()),
        ("detailed_analysis", research.detailed_analysis.clone()),
        ("recommendations", research.recommendations.clone()),
        ("considerations", research.considerations.clone()),
    ])
}

impl Agent for PlanningAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn role(&self) -> AgentRole {
        AgentRole::Planning
    }

    fn state(&self) -> AgentState {
        self.core.state()
    }

    fn process<'a>(&'a self, task: &'a Task) -> ProcessFuture<'a> {
        Box::pin(self.plan(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::state::AgentStatus;
    use crate::test_support::{PLANNING_RESPONSE, ScriptedModel};

    fn research() -> ResearchContext {
        ResearchContext {
            summary: "Use Redis".into(),
            detailed_analysis: "Compared Redis and memcached".into(),
            recommendations: "Redis 7".into(),
            considerations: "Memory limits".into(),
        }
    }

    #[tokio::test]
    async fn test_plan_parses_sections() {
        let model = Arc::new(ScriptedModel::replying(PLANNING_RESPONSE));
        let agent = PlanningAgent::new(model.clone());
        let task = Task::new("Add caching").with_research_results(research());

        let result = agent.process(&task).await.unwrap();
        let plan = result.planning().expect("planning payload");

        assert_eq!(plan.plan, "1. Add Redis");
        assert_eq!(plan.technical_specifications, "GET /cache/:key");
        assert_eq!(plan.timeline, "2 weeks");
        assert_eq!(plan.resources, "redis 7");
        assert_eq!(plan.risks_and_mitigations, "Stale reads: short TTL");
        assert_eq!(plan.confidence, 0.9);
        assert_eq!(agent.state().status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_prompt_embeds_research() {
        let model = Arc::new(ScriptedModel::replying(PLANNING_RESPONSE));
        let agent = PlanningAgent::new(model.clone());
        let task = Task::new("Add caching").with_research_results(research());

        agent.process(&task).await.unwrap();

        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("Research Summary: Use Redis"));
        assert!(prompt.contains("Detailed Analysis: Compared Redis and memcached"));
        assert!(prompt.contains("Recommendations: Redis 7"));
        assert!(prompt.contains("Implementation Considerations: Memory limits"));
    }

    #[tokio::test]
    async fn test_missing_research_skips_model() {
        let model = Arc::new(ScriptedModel::replying(PLANNING_RESPONSE));
        let agent = PlanningAgent::new(model.clone());

        let result = agent.process(&Task::new("Add caching")).await.unwrap();
        assert_eq!(result.message(), Some("research_results is required"));

        let blank = Task::new("Add caching").with_research_results(ResearchContext::default());
        let result = agent.process(&blank).await.unwrap();
        assert_eq!(result.message(), Some("research_results is required"));

        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_description_checked_first() {
        let model = Arc::new(ScriptedModel::replying(PLANNING_RESPONSE));
        let agent = PlanningAgent::new(model.clone());

        let result = agent.process(&Task::new("")).await.unwrap();
        assert_eq!(result.message(), Some("description is required"));
    }

    #[tokio::test]
    async fn test_low_confidence_profile_gets_suggestions() {
        let model = Arc::new(ScriptedModel::replying(PLANNING_RESPONSE));
        let agent = PlanningAgent::new(model.clone())
            .with_profile(RoleProfile::planning().with_confidence(0.5))
            .with_reflection(Reflector::new());
        let task = Task::new("Add caching").with_research_results(research());

        agent.process(&task).await.unwrap();

        let logs = agent.reflections();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "planning");
        assert_eq!(logs[0].improvement_suggestions.len(), 3);
    }

    #[test]
    fn test_agent_identity() {
        let agent = PlanningAgent::named("planner-2", Arc::new(ScriptedModel::replying("")));
        assert_eq!(agent.name(), "planner-2");
        assert_eq!(agent.role(), AgentRole::Planning);
    }
}
