//! Invocation pipeline shared by every role

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::prompt::RoleProfile;
use super::sections::Sections;
use super::state::{AgentState, StateTracker};
use super::task::Task;
use super::traits::{AgentResult, FailurePolicy, Payload};
use crate::error::{Error, Result};
use crate::learning::LearningStore;
use crate::llm::LanguageModel;
use crate::reflection::{PerformanceMetrics, ReflectionLog, Reflector};

/// State and collaborators of one agent
pub(crate) struct AgentCore {
    name: String,
    profile: RoleProfile,
    llm: Arc<dyn LanguageModel>,
    state: StateTracker,
    policy: FailurePolicy,
    reflector: Option<Mutex<Reflector>>,
    learning: Option<Arc<Mutex<LearningStore>>>,
}

impl AgentCore {
    pub(crate) fn new(name: String, profile: RoleProfile, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            state: StateTracker::new(name.clone()),
            name,
            profile,
            llm,
            policy: FailurePolicy::default(),
            reflector: None,
            learning: None,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn profile(&self) -> &RoleProfile {
        &self.profile
    }

    pub(crate) fn set_profile(&mut self, profile: RoleProfile) {
        self.profile = profile;
    }

    pub(crate) fn set_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
    }

    pub(crate) fn set_reflector(&mut self, reflector: Reflector) {
        self.reflector = Some(Mutex::new(reflector));
    }

    pub(crate) fn set_learning(&mut self, store: Arc<Mutex<LearningStore>>) {
        self.learning = Some(store);
    }

    pub(crate) fn state(&self) -> AgentState {
        self.state.snapshot()
    }

    pub(crate) fn reflection_metrics(&self) -> Option<PerformanceMetrics> {
        self.reflector
            .as_ref()
            .map(|r| r.lock().unwrap_or_else(|e| e.into_inner()).metrics())
    }

    pub(crate) fn reflections(&self) -> Vec<ReflectionLog> {
        self.reflector
            .as_ref()
            .map(|r| r.lock().unwrap_or_else(|e| e.into_inner()).logs().to_vec())
            .unwrap_or_default()
    }

    /// Result for a task that failed a precondition on `field`
    pub(crate) fn reject(&self, field: &str) -> AgentResult {
        let message = Error::Validation(field.to_string()).to_string();
        warn!(agent = %self.name, role = %self.profile.role, reason = %message, "Rejected task");
        self.reflect_failure(&message);
        AgentResult::error(message)
    }

    /// Render, call the model, parse, and build the role's payload
    pub(crate) async fn run<F>(
        &self,
        task: &Task,
        vars: HashMap<&str, String>,
        build: F,
    ) -> Result<AgentResult>
    where
        F: FnOnce(&Sections, f64) -> Payload + Send,
    {
        let guard = self.state.begin(task);
        let role = self.profile.role;

        info!(agent = %self.name, role = %role, "Processing task");
        let prompt = self.profile.render(&vars);

        let generation = match self.llm.generate(&prompt).await {
            Ok(generation) => generation,
            Err(e) => {
                let message = e.to_string();
                warn!(agent = %self.name, role = %role, error = %message, "Model call failed");
                self.reflect_failure(&message);
                return match self.policy {
                    FailurePolicy::Wrap => Ok(AgentResult::error(message)),
                    FailurePolicy::Propagate => {
                        guard.fail();
                        Err(e)
                    }
                };
            }
        };

        debug!(
            agent = %self.name,
            model = %generation.model,
            tokens = generation.tokens_used(),
            "Parsing response sections"
        );

        let sections = self.profile.parser().parse(&generation.text);
        let payload = build(&sections, self.profile.confidence);
        let confidence = payload.confidence();

        self.state
            .remember("last_confidence", serde_json::json!(confidence));
        self.reflect_success(confidence);
        self.record_example(task, &payload).await;

        info!(agent = %self.name, role = %role, confidence, "Task completed");
        Ok(AgentResult::completed(payload))
    }

    fn reflect_success(&self, confidence: f64) {
        let Some(reflector) = &self.reflector else {
            return;
        };
        let role = self.profile.role.to_string();
        let outcome = serde_json::json!({ "confidence_scores": { role.as_str(): confidence } });
        reflector
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reflect(&role, &outcome, true, None);
    }

    fn reflect_failure(&self, message: &str) {
        let Some(reflector) = &self.reflector else {
            return;
        };
        let role = self.profile.role.to_string();
        let outcome = serde_json::json!({ "status": "error", "message": message });
        reflector
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reflect(&role, &outcome, false, Some(message));
    }

    async fn record_example(&self, task: &Task, payload: &Payload) {
        let Some(store) = &self.learning else {
            return;
        };

        let input = match serde_json::to_value(task) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        let output = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(agent = %self.name, error = %e, "Skipping learning example");
                return;
            }
        };
        let metrics = HashMap::from([("confidence".to_string(), payload.confidence())]);
        let tags = vec![self.profile.role.to_string()];

        // the store rewrites its file, so keep it off the executor
        let store = Arc::clone(store);
        let added = tokio::task::spawn_blocking(move || {
            store
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .add_example(input, output, metrics, tags)
        })
        .await;

        match added {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(agent = %self.name, error = %e, "Failed to save learning example"),
            Err(e) => warn!(agent = %self.name, error = %e, "Learning example task failed"),
        }
    }
}
