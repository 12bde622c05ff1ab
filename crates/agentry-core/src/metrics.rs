//! Per-run task metrics

use std::time::Duration;

use crate::agents::{AgentResult, Task};

/// Summary numbers for one coordinator run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskMetrics {
    /// Wall-clock time from start of the run to its result
    pub completion_time: Duration,
    /// Completed agent results over all agent results, 0.0 to 1.0
    pub success_rate: f64,
    /// One point per agent result plus one per task requirement
    pub complexity_score: usize,
}

impl TaskMetrics {
    /// Compute metrics from the agent results a run produced
    ///
    /// A run with no agent results (a deadline expiry, say) has a success
    /// rate of 0.
    pub fn calculate(
        task: &Task,
        results: &[(String, AgentResult)],
        completion_time: Duration,
    ) -> Self {
        let completed = results.iter().filter(|(_, r)| r.is_completed()).count();
        let success_rate = if results.is_empty() {
            0.0
        } else {
            completed as f64 / results.len() as f64
        };

        Self {
            completion_time,
            success_rate,
            complexity_score: results.len() + task.requirements.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Payload, PlanningPayload};

    fn plan() -> AgentResult {
        AgentResult::completed(Payload::Planning(PlanningPayload {
            plan: "p".into(),
            technical_specifications: "t".into(),
            timeline: "tl".into(),
            resources: "r".into(),
            risks_and_mitigations: "rm".into(),
            confidence: 0.9,
        }))
    }

    #[test]
    fn test_metrics_from_mixed_results() {
        let task = Task::new("Add caching")
            .with_requirement("low latency")
            .with_requirement("no stale reads");
        let results = vec![
            ("planner".to_string(), plan()),
            (
                "researcher".to_string(),
                AgentResult::error("description is required"),
            ),
        ];

        let metrics = TaskMetrics::calculate(&task, &results, Duration::from_secs(3));

        assert_eq!(metrics.completion_time, Duration::from_secs(3));
        assert!((metrics.success_rate - 0.5).abs() < 1e-9);
        assert_eq!(metrics.complexity_score, 4);
    }

    #[test]
    fn test_metrics_without_results() {
        let task = Task::new("Add caching").with_requirement("low latency");
        let metrics = TaskMetrics::calculate(&task, &[], Duration::ZERO);

        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.complexity_score, 1);
    }
}
