//! Self-reflection for agents
//!
//! A [`Reflector`] records the outcome of every action an agent takes,
//! keeps running performance aggregates, and attaches improvement
//! suggestions to failures and low-confidence results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default confidence below which a successful outcome is flagged
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

const SUCCESS_CONFIDENCE: f64 = 0.8;
const FAILURE_CONFIDENCE: f64 = 0.4;

/// Coarse classification of an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    Validation,
    Permission,
    NotFound,
    RateLimit,
    /// An error message matched no known category
    Other,
    /// No error message was given
    Unknown,
}

/// Keyword table, checked in order; the first category with a match wins
const CATEGORY_KEYWORDS: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::Timeout,
        &["timeout", "timed out", "deadline exceeded"],
    ),
    (ErrorCategory::Validation, &["invalid", "validation", "schema"]),
    (
        ErrorCategory::Permission,
        &["permission", "unauthorized", "forbidden"],
    ),
    (ErrorCategory::NotFound, &["not found", "missing", "404"]),
    (ErrorCategory::RateLimit, &["rate limit", "too many requests"]),
];

impl ErrorCategory {
    /// Categorize an error message by case-insensitive keyword match
    pub fn categorize(error: Option<&str>) -> Self {
        let Some(error) = error.filter(|e| !e.is_empty()) else {
            return Self::Unknown;
        };
        let lower = error.to_lowercase();

        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::Permission => "permission",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    /// Fixed remediation hint for the category
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Timeout => "Implement exponential backoff retry logic",
            Self::Validation => "Add input validation and schema checks",
            Self::Permission => "Implement proper authentication flow",
            Self::NotFound => "Add existence checks before operations",
            Self::RateLimit => "Implement rate limiting and queuing",
            Self::Other => "Review error handling and add logging",
            Self::Unknown => "Add comprehensive error tracking",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded action outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionLog {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub outcome: serde_json::Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub confidence: f64,
    pub learning_points: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

/// Running aggregates over all reflections
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub success_rate: f64,
    pub average_confidence: f64,
    pub tasks_completed: u64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            success_rate: 1.0,
            average_confidence: 0.0,
            tasks_completed: 0,
        }
    }
}

impl PerformanceMetrics {
    /// Fold one outcome into the running means
    fn record(&mut self, success: bool, confidence: f64) {
        self.tasks_completed += 1;
        let n = self.tasks_completed as f64;
        let hit = if success { 1.0 } else { 0.0 };
        self.success_rate = (self.success_rate * (n - 1.0) + hit) / n;
        self.average_confidence = (self.average_confidence * (n - 1.0) + confidence) / n;
    }
}

/// Outcome history plus aggregates for one agent
#[derive(Debug, Clone)]
pub struct Reflector {
    logs: Vec<ReflectionLog>,
    metrics: PerformanceMetrics,
    confidence_threshold: f64,
}

impl Reflector {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_CONFIDENCE_THRESHOLD)
    }

    /// Create a reflector flagging successes below `threshold`
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            logs: Vec::new(),
            metrics: PerformanceMetrics::default(),
            confidence_threshold: threshold,
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    pub fn logs(&self) -> &[ReflectionLog] {
        &self.logs
    }

    /// Record an action outcome and return the stored log entry
    pub fn reflect(
        &mut self,
        action: &str,
        outcome: &serde_json::Value,
        success: bool,
        error: Option<&str>,
    ) -> &ReflectionLog {
        let mut learning_points = Vec::new();
        let mut improvement_suggestions = Vec::new();
        let mut confidence = if success {
            SUCCESS_CONFIDENCE
        } else {
            FAILURE_CONFIDENCE
        };

        let category = ErrorCategory::categorize(error);

        if success {
            learning_points.push(format!("Successfully completed {}", action));
            if let Some(mean) = mean_confidence_score(outcome) {
                confidence = mean;
            }
        } else {
            learning_points.push(format!(
                "Failed to complete {}: {}",
                action,
                error.unwrap_or("Unknown error")
            ));
            improvement_suggestions.push(category.suggestion().to_string());
        }

        self.metrics.record(success, confidence);

        if !success {
            improvement_suggestions.extend([
                format!("Review error handling for {}", category),
                "Add additional validation steps".to_string(),
                "Consider implementing retry logic".to_string(),
            ]);
        } else if confidence < self.confidence_threshold {
            improvement_suggestions.extend([
                "Gather additional context before processing".to_string(),
                "Implement confidence threshold checks".to_string(),
                "Add verification steps for uncertain outcomes".to_string(),
            ]);
        }

        debug!(
            action = %action,
            success,
            confidence,
            success_rate = self.metrics.success_rate,
            "Recorded reflection"
        );

        let index = self.logs.len();
        self.logs.push(ReflectionLog {
            timestamp: Utc::now(),
            action: action.to_string(),
            outcome: outcome.clone(),
            success,
            error: error.map(str::to_string),
            confidence,
            learning_points,
            improvement_suggestions,
        });
        &self.logs[index]
    }
}

impl Default for Reflector {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean of `outcome.confidence_scores` when it is a non-empty numeric object
fn mean_confidence_score(outcome: &serde_json::Value) -> Option<f64> {
    let scores = outcome.get("confidence_scores")?.as_object()?;
    let values: Vec<f64> = scores.values().filter_map(|v| v.as_f64()).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
