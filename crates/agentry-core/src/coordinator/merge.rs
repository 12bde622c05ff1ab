//! Merging fan-out results by payload shape

use tracing::warn;

use super::result::CombinedResult;
use crate::agents::{AgentResult, Payload, PlanningPayload, ResearchPayload};

/// Research and planning output gathered from a fan-out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutMerge {
    pub research_results: Option<ResearchPayload>,
    pub plan: Option<PlanningPayload>,
}

impl FanOutMerge {
    /// Map onto the canonical nested-phase shape
    pub fn into_combined(self) -> CombinedResult {
        CombinedResult::completed(self.research_results, self.plan)
    }
}

/// Merge named agent results
///
/// Results are visited in agent-name order and the first payload of each
/// kind wins, so the outcome does not depend on the order of `results`.
/// Error results contribute nothing.
pub fn merge_results(results: &[(String, AgentResult)]) -> FanOutMerge {
    let mut ordered: Vec<&(String, AgentResult)> = results.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let mut merged = FanOutMerge::default();
    for (name, result) in ordered {
        match result {
            AgentResult::Completed {
                payload: Payload::Research(research),
            } => {
                if merged.research_results.is_none() {
                    merged.research_results = Some(research.clone());
                }
            }
            AgentResult::Completed {
                payload: Payload::Planning(plan),
            } => {
                if merged.plan.is_none() {
                    merged.plan = Some(plan.clone());
                }
            }
            AgentResult::Error { message, .. } => {
                warn!(agent = %name, error = %message, "Agent failed during fan-out");
            }
        }
    }

    if merged.research_results.is_none() {
        warn!("Fan-out produced no research results");
    }
    if merged.plan.is_none() {
        warn!("Fan-out produced no plan");
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn research(summary: &str) -> AgentResult {
        AgentResult::completed(Payload::Research(ResearchPayload {
            summary: summary.into(),
            detailed_analysis: "a".into(),
            recommendations: "r".into(),
            considerations: "c".into(),
            confidence: 0.85,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 20, 10, 30, 0).unwrap(),
        }))
    }

    fn plan(text: &str) -> AgentResult {
        AgentResult::completed(Payload::Planning(PlanningPayload {
            plan: text.into(),
            technical_specifications: "t".into(),
            timeline: "tl".into(),
            resources: "r".into(),
            risks_and_mitigations: "rm".into(),
            confidence: 0.9,
        }))
    }

    fn named(name: &str, result: AgentResult) -> (String, AgentResult) {
        (name.to_string(), result)
    }

    #[test]
    fn test_merge_by_shape() {
        let merged = merge_results(&[
            named("planner", plan("p")),
            named("researcher", research("s")),
        ]);

        assert_eq!(merged.research_results.unwrap().summary, "s");
        assert_eq!(merged.plan.unwrap().plan, "p");
    }

    #[test]
    fn test_merge_is_order_independent() {
        let results = vec![
            named("researcher-b", research("b")),
            named("planner", plan("p")),
            named("researcher-a", research("a")),
            named("broken", AgentResult::error("boom")),
        ];
        let mut reversed = results.clone();
        reversed.reverse();

        let forward = merge_results(&results);
        assert_eq!(forward, merge_results(&reversed));
        assert_eq!(forward.research_results.as_ref().unwrap().summary, "a");
    }

    #[test]
    fn test_errors_contribute_nothing() {
        let merged = merge_results(&[
            named("researcher", AgentResult::error("timeout")),
            named("planner", plan("p")),
        ]);
        assert!(merged.research_results.is_none());
        assert!(merged.plan.is_some());
    }

    #[test]
    fn test_into_combined_requires_research_for_plan() {
        let combined = merge_results(&[named("planner", plan("p"))]).into_combined();
        assert!(combined.is_completed());
        assert!(combined.research_phase().is_none());
        assert!(combined.planning_phase().is_none());
    }

    #[test]
    fn test_empty_merge() {
        let merged = merge_results(&[]);
        assert_eq!(merged, FanOutMerge::default());
    }
}
