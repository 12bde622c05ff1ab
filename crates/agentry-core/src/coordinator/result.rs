//! Combined pipeline result

use serde::{Deserialize, Serialize};

use crate::agents::{AgentResult, PlanningPayload, ResearchPayload};
use crate::error::{Error, Result};

/// Per-phase confidence reported with a completed result
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning: Option<f64>,
}

impl ConfidenceScores {
    pub fn is_empty(&self) -> bool {
        self.research.is_none() && self.planning.is_none()
    }

    /// Mean over the phases that reported a score
    pub fn mean(&self) -> Option<f64> {
        let scores: Vec<f64> = [self.research, self.planning].into_iter().flatten().collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Outcome of one coordinator invocation
///
/// A completed result never carries a planning phase without a research
/// phase; use [`CombinedResult::completed`] to build one. Deserializing
/// checks the same rule through [`CombinedResult::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", try_from = "RawCombined")]
pub enum CombinedResult {
    Completed {
        #[serde(skip_serializing_if = "Option::is_none")]
        research_phase: Option<ResearchPayload>,
        #[serde(skip_serializing_if = "Option::is_none")]
        planning_phase: Option<PlanningPayload>,
        confidence_scores: ConfidenceScores,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

/// Wire form of [`CombinedResult`] before validation
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RawCombined {
    Completed {
        #[serde(default)]
        research_phase: Option<ResearchPayload>,
        #[serde(default)]
        planning_phase: Option<PlanningPayload>,
        #[serde(default)]
        confidence_scores: ConfidenceScores,
    },
    Error {
        message: String,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
}

impl RawCombined {
    fn into_result(self) -> CombinedResult {
        match self {
            RawCombined::Completed {
                research_phase,
                planning_phase,
                confidence_scores,
            } => CombinedResult::Completed {
                research_phase,
                planning_phase,
                confidence_scores,
            },
            RawCombined::Error { message, details } => CombinedResult::Error { message, details },
        }
    }
}

impl TryFrom<RawCombined> for CombinedResult {
    type Error = Error;

    fn try_from(raw: RawCombined) -> Result<Self> {
        let result = raw.into_result();
        result.validate()?;
        Ok(result)
    }
}

impl CombinedResult {
    /// Build a completed result, dropping a plan that has no research behind it
    pub fn completed(research: Option<ResearchPayload>, planning: Option<PlanningPayload>) -> Self {
        let planning = research.as_ref().and(planning);
        let confidence_scores = ConfidenceScores {
            research: research.as_ref().map(|r| r.confidence),
            planning: planning.as_ref().map(|p| p.confidence),
        };
        Self::Completed {
            research_phase: research,
            planning_phase: planning,
            confidence_scores,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }

    /// Error for a phase whose agent did not complete
    pub fn phase_failed(message: impl Into<String>, result: &AgentResult) -> Self {
        Self::Error {
            message: message.into(),
            details: serde_json::to_value(result).ok(),
        }
    }

    /// Check that planning output and scores only appear alongside research
    pub fn validate(&self) -> Result<()> {
        if let Self::Completed {
            research_phase: None,
            planning_phase,
            confidence_scores,
        } = self
            && (planning_phase.is_some() || !confidence_scores.is_empty())
        {
            return Err(Error::Validation("research_phase".to_string()));
        }
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn research_phase(&self) -> Option<&ResearchPayload> {
        match self {
            Self::Completed { research_phase, .. } => research_phase.as_ref(),
            Self::Error { .. } => None,
        }
    }

    pub fn planning_phase(&self) -> Option<&PlanningPayload> {
        match self {
            Self::Completed { planning_phase, .. } => planning_phase.as_ref(),
            Self::Error { .. } => None,
        }
    }

    pub fn confidence_scores(&self) -> Option<&ConfidenceScores> {
        match self {
            Self::Completed {
                confidence_scores, ..
            } => Some(confidence_scores),
            Self::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            Self::Completed { .. } => None,
        }
    }

    /// The failed agent result attached to a phase failure
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Error { details, .. } => details.as_ref(),
            Self::Completed { .. } => None,
        }
    }
}
