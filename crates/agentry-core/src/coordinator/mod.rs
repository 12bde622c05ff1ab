//! Task coordination
//!
//! The [`TaskManager`] drives agents in one of two modes:
//! - sequential: research, then planning on a task derived from the research
//! - fan-out: every pooled agent at once, under one shared deadline
//!
//! Entry points always return a [`CombinedResult`] (or a [`TaskReport`]
//! wrapping one); agent failures become error results rather than `Err`.

mod merge;
mod result;

pub use merge::{FanOutMerge, merge_results};
pub use result::{CombinedResult, ConfidenceScores};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::agents::{Agent, AgentResult, ResearchContext, Task};
use crate::config::CoordinatorConfig;
use crate::error::Error;
use crate::metrics::TaskMetrics;

/// Deadline applied to fan-out runs unless configured otherwise
pub const DEFAULT_DEADLINE_SECS: u64 = 90;

/// A coordinator result with the agent results behind it
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub result: CombinedResult,
    /// Per-agent results in the order they were collected
    pub agent_results: Vec<(String, AgentResult)>,
    pub metrics: TaskMetrics,
}

/// Coordinates a pool of agents
pub struct TaskManager {
    agents: BTreeMap<String, Arc<dyn Agent>>,
    researcher: String,
    planner: String,
    deadline: Duration,
}

impl TaskManager {
    /// Create a manager whose pipeline runs `researcher` then `planner`
    pub fn new(researcher: Arc<dyn Agent>, planner: Arc<dyn Agent>) -> Self {
        let mut manager = Self {
            agents: BTreeMap::new(),
            researcher: researcher.name().to_string(),
            planner: planner.name().to_string(),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
        };
        manager.register_agent(researcher);
        manager.register_agent(planner);
        manager
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_config(self, config: &CoordinatorConfig) -> Self {
        self.with_deadline(Duration::from_secs(config.deadline_secs))
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Add an agent to the pool, returning the agent it replaced by name
    pub fn register_agent(&mut self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        let name = agent.name().to_string();
        debug!(agent = %name, role = %agent.role(), "Registering agent");
        let replaced = self.agents.insert(name.clone(), agent);
        if replaced.is_some() {
            warn!(agent = %name, "Replaced agent with the same name");
        }
        replaced
    }

    pub fn agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    /// Registered agent names, sorted
    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    /// Run research then planning
    pub async fn process_task(&self, task: &Task) -> CombinedResult {
        self.run_pipeline(task).await.result
    }

    /// Run every pooled agent concurrently on `task`
    ///
    /// If the deadline passes, all outstanding calls are cancelled and any
    /// partial results are discarded.
    pub async fn process_concurrent(&self, task: &Task) -> CombinedResult {
        self.run_fan_out(task).await.result
    }

    /// [`process_task`](Self::process_task) with agent results and metrics
    pub async fn run_pipeline(&self, task: &Task) -> TaskReport {
        let started = Instant::now();
        let mut agent_results = Vec::with_capacity(2);
        let result = self.pipeline(task, &mut agent_results).await;
        report(task, result, agent_results, started)
    }

    /// [`process_concurrent`](Self::process_concurrent) with agent results and metrics
    pub async fn run_fan_out(&self, task: &Task) -> TaskReport {
        let started = Instant::now();
        let (result, agent_results) = self.fan_out(task).await;
        report(task, result, agent_results, started)
    }

    async fn pipeline(
        &self,
        task: &Task,
        agent_results: &mut Vec<(String, AgentResult)>,
    ) -> CombinedResult {
        let (Some(researcher), Some(planner)) =
            (self.agent(&self.researcher), self.agent(&self.planner))
        else {
            return CombinedResult::error("Pipeline agents are not registered");
        };

        info!(agent = %researcher.name(), "Starting research phase");
        let research = match researcher.process(task).await {
            Ok(result) => result,
            Err(e) => return escaped(researcher.name(), e, agent_results),
        };
        agent_results.push((researcher.name().to_string(), research.clone()));
        let Some(findings) = research.research() else {
            error!(agent = %researcher.name(), "Research phase failed");
            return CombinedResult::phase_failed("Research phase failed", &research);
        };
        let findings = findings.clone();

        let planning_task = task.with_research_results(ResearchContext::from(&findings));

        info!(agent = %planner.name(), "Starting planning phase");
        let planning = match planner.process(&planning_task).await {
            Ok(result) => result,
            Err(e) => return escaped(planner.name(), e, agent_results),
        };
        agent_results.push((planner.name().to_string(), planning.clone()));
        let Some(plan) = planning.planning() else {
            error!(agent = %planner.name(), "Planning phase failed");
            return CombinedResult::phase_failed("Planning phase failed", &planning);
        };

        CombinedResult::completed(Some(findings), Some(plan.clone()))
    }

    async fn fan_out(&self, task: &Task) -> (CombinedResult, Vec<(String, AgentResult)>) {
        let agents: Vec<&Arc<dyn Agent>> = self.agents.values().collect();
        let deadline_secs = self.deadline_secs();
        info!(agents = agents.len(), deadline_secs, "Starting fan-out");

        let calls = join_all(agents.iter().map(|agent| agent.process(task)));
        let outcomes = match tokio::time::timeout(self.deadline, calls).await {
            Ok(outcomes) => outcomes,
            Err(_) => {
                let err = Error::Timeout(deadline_secs);
                error!(error = %err, "Fan-out deadline exceeded");
                return (CombinedResult::error(err.to_string()), Vec::new());
            }
        };

        let mut agent_results = Vec::with_capacity(outcomes.len());
        let mut failure = None;
        for (agent, outcome) in agents.iter().zip(outcomes) {
            match outcome {
                Ok(result) => agent_results.push((agent.name().to_string(), result)),
                Err(e) => {
                    let result = escaped(agent.name(), e, &mut agent_results);
                    if failure.is_none() {
                        failure = Some(result);
                    }
                }
            }
        }

        let result = match failure {
            Some(failure) => failure,
            None => merge_results(&agent_results).into_combined(),
        };
        (result, agent_results)
    }

    /// Deadline in whole seconds, rounded up
    fn deadline_secs(&self) -> u64 {
        let secs = self.deadline.as_secs();
        if self.deadline.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

fn report(
    task: &Task,
    result: CombinedResult,
    agent_results: Vec<(String, AgentResult)>,
    started: Instant,
) -> TaskReport {
    let metrics = TaskMetrics::calculate(task, &agent_results, started.elapsed());
    info!(
        elapsed_ms = metrics.completion_time.as_millis() as u64,
        completed = result.is_completed(),
        success_rate = metrics.success_rate,
        complexity = metrics.complexity_score,
        "Run finished"
    );
    TaskReport {
        result,
        agent_results,
        metrics,
    }
}

/// Record an `Err` that escaped an agent and turn it into a result
fn escaped(
    agent: &str,
    err: Error,
    agent_results: &mut Vec<(String, AgentResult)>,
) -> CombinedResult {
    error!(agent = %agent, code = err.code(), error = %err, "Agent returned an error");
    let message = err.to_string();
    agent_results.push((agent.to_string(), AgentResult::error(message.clone())));
    CombinedResult::error(message)
}
