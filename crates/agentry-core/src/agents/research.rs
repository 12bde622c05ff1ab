//! Research agent - analyses a task before planning
//!
//! The research agent is the first pipeline stage. It asks the model for a
//! summary, an analysis of the options, recommendations, and
//! implementation considerations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::AgentRole;
use super::prompt::RoleProfile;
use super::runner::AgentCore;
use super::state::AgentState;
use super::task::Task;
use super::traits::{Agent, AgentResult, FailurePolicy, Payload, ProcessFuture, ResearchPayload};
use crate::error::Result;
use crate::learning::LearningStore;
use crate::llm::LanguageModel;
use crate::reflection::{PerformanceMetrics, ReflectionLog, Reflector};

/// Name given to a research agent by [`ResearchAgent::new`]
pub const DEFAULT_RESEARCH_AGENT_NAME: &str = "researcher";

/// Research agent
pub struct ResearchAgent {
    core: AgentCore,
}

impl ResearchAgent {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self::named(DEFAULT_RESEARCH_AGENT_NAME, llm)
    }

    pub fn named(name: impl Into<String>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            core: AgentCore::new(name.into(), RoleProfile::research(), llm),
        }
    }

    /// Replace the prompt template, headers or confidence
    pub fn with_profile(mut self, profile: RoleProfile) -> Self {
        self.core.set_profile(profile);
        self
    }

    pub fn with_reflection(mut self, reflector: Reflector) -> Self {
        self.core.set_reflector(reflector);
        self
    }

    /// Record one example per completed invocation in a shared store
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

    async fn research(&self, task: &Task) -> Result<AgentResult> {
        if !task.has_description() {
            return Ok(self.core.reject("description"));
        }

        let vars = HashMap::from([
            ("description", task.description.clone()),
            ("task_details", task.format_details()),
        ]);

        self.core
            .run(task, vars, |sections, confidence| {
                Payload::Research(ResearchPayload {
                    summary: sections.content("SUMMARY"),
                    detailed_analysis: sections.content("ANALYSIS"),
                    recommendations: sections.content("RECOMMENDATIONS"),
                    considerations: sections.content("CONSIDERATIONS"),
                    confidence,
                    timestamp: Utc::now(),
                })
            })
            .await
    }
}

impl Agent for ResearchAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn role(&self) -> AgentRole {
        AgentRole::Research
    }

    fn state(&self) -> AgentState {
        self.core.state()
    }

    fn process<'a>(&'a self, task: &'a Task) -> ProcessFuture<'a> {
        Box::pin(self.research(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::sections::NO_CONTENT;
    use crate::agents::state::AgentStatus;
    use crate::test_support::{RESEARCH_RESPONSE, ScriptedModel};
    use std::time::Duration;
    use tempfile::TempDir;

    fn agent_with(model: &Arc<ScriptedModel>) -> ResearchAgent {
        ResearchAgent::new(model.clone())
    }

    #[tokio::test]
    async fn test_research_parses_sections() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let agent = agent_with(&model);

        let result = agent.process(&Task::new("Add caching")).await.unwrap();
        let research = result.research().expect("research payload");

        assert_eq!(research.summary, "Use a write-through cache");
        assert_eq!(research.detailed_analysis, "Redis vs in-process");
        assert_eq!(research.recommendations, "- Redis");
        assert_eq!(research.considerations, "Eviction policy");
        assert_eq!(research.confidence, 0.85);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_prompt_contains_task_details() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let agent = agent_with(&model);

        let task = Task::new("Add caching")
            .with_priority("high")
            .with_requirement("p99 < 10ms");
        agent.process(&task).await.unwrap();

        let prompt = model.last_prompt().unwrap();
        assert!(prompt.starts_with("Task: Add caching"));
        assert!(prompt.contains("Priority: HIGH"));
        assert!(prompt.contains("- p99 < 10ms"));
    }

    #[tokio::test]
    async fn test_empty_description_skips_model() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let agent = agent_with(&model);

        let result = agent.process(&Task::new("   ")).await.unwrap();

        assert_eq!(result.message(), Some("description is required"));
        assert_eq!(model.calls(), 0);
        assert_eq!(agent.state().status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_unstructured_response_gets_placeholders() {
        let model = Arc::new(ScriptedModel::replying("I cannot help with that."));
        let agent = agent_with(&model);

        let result = agent.process(&Task::new("x")).await.unwrap();
        let research = result.research().unwrap();
        assert_eq!(research.summary, NO_CONTENT);
        assert_eq!(research.considerations, NO_CONTENT);
    }

    #[tokio::test]
    async fn test_model_failure_is_wrapped() {
        let model = Arc::new(ScriptedModel::failing("connection reset"));
        let agent = agent_with(&model);

        let result = agent.process(&Task::new("x")).await.unwrap();

        assert_eq!(result.message(), Some("LLM API error: connection reset"));
        assert_eq!(agent.state().status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_propagate_policy_returns_err() {
        let model = Arc::new(ScriptedModel::failing("connection reset"));
        let agent = agent_with(&model).with_failure_policy(FailurePolicy::Propagate);

        let err = agent.process(&Task::new("x")).await.unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        let state = agent.state();
        assert_eq!(state.status, AgentStatus::Error);
        assert!(state.current_task.is_none());
    }

    #[tokio::test]
    async fn test_state_resets_after_success() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let agent = agent_with(&model);
        agent.process(&Task::new("x")).await.unwrap();

        let state = agent.state();
        assert_eq!(state.name, "researcher");
        assert_eq!(state.status, AgentStatus::Idle);
        assert!(state.current_task.is_none());
        assert_eq!(state.memory["last_confidence"], serde_json::json!(0.85));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_resets_state() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE).delayed(Duration::from_secs(60)));
        let agent = agent_with(&model);
        let task = Task::new("slow");

        let outcome = tokio::time::timeout(Duration::from_secs(1), agent.process(&task)).await;

        assert!(outcome.is_err());
        assert_eq!(agent.state().status, AgentStatus::Idle);
        assert!(agent.state().current_task.is_none());
    }

    #[tokio::test]
    async fn test_reflection_records_outcomes() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let agent = agent_with(&model).with_reflection(Reflector::new());

        agent.process(&Task::new("x")).await.unwrap();
        agent.process(&Task::new("")).await.unwrap();

        let metrics = agent.reflection_metrics().unwrap();
        assert_eq!(metrics.tasks_completed, 2);
        assert!((metrics.success_rate - 0.5).abs() < 1e-9);

        let logs = agent.reflections();
        assert!((logs[0].confidence - 0.85).abs() < 1e-9);
        assert_eq!(logs[0].action, "research");
        assert_eq!(logs[1].error.as_deref(), Some("description is required"));
    }

    #[tokio::test]
    async fn test_learning_records_completed_runs() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let store = Arc::new(Mutex::new(LearningStore::new()));
        let agent = agent_with(&model).with_learning(store.clone());

        agent.process(&Task::new("Add caching")).await.unwrap();
        agent.process(&Task::new("")).await.unwrap();

        let store = store.lock().unwrap();
        assert_eq!(store.len(), 1);
        let example = &store.examples()[0];
        assert_eq!(example.input_data["description"], "Add caching");
        assert_eq!(example.tags, vec!["research"]);
        assert_eq!(example.performance_metrics["confidence"], 0.85);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_runs_share_persisted_store() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let store = Arc::new(Mutex::new(LearningStore::open(dir.path()).unwrap()));
        let first = ResearchAgent::named("first", model.clone()).with_learning(store.clone());
        let second = ResearchAgent::named("second", model.clone()).with_learning(store.clone());
        let task = Task::new("Add caching");

        let (a, b) = tokio::join!(first.process(&task), second.process(&task));

        assert!(a.unwrap().is_completed());
        assert!(b.unwrap().is_completed());
        assert_eq!(store.lock().unwrap().len(), 2);
        assert_eq!(LearningStore::open(dir.path()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_custom_profile() {
        let model = Arc::new(ScriptedModel::replying(RESEARCH_RESPONSE));
        let profile = RoleProfile::research()
            .with_template("Be brief. {description}")
            .with_confidence(0.6);
        let agent = agent_with(&model).with_profile(profile);

        let result = agent.process(&Task::new("Add caching")).await.unwrap();

        assert_eq!(model.last_prompt().as_deref(), Some("Be brief. Add caching"));
        assert_eq!(result.research().unwrap().confidence, 0.6);
    }
}
