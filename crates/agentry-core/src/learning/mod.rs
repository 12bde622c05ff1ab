//! Adaptive learning from past outcomes
//!
//! A [`LearningStore`] keeps examples of completed work with their
//! performance metrics, finds examples similar to a new input, and slowly
//! raises its performance bar as better examples arrive.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// File name used inside a store directory
pub const EXAMPLES_FILE: &str = "examples.json";

const INITIAL_PERFORMANCE_THRESHOLD: f64 = 0.7;
const ADAPTATION_RATE: f64 = 0.1;
const TOP_TAGS: usize = 5;

/// A recorded input/output pair with its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningExample {
    pub input_data: serde_json::Map<String, serde_json::Value>,
    pub output_data: serde_json::Value,
    pub performance_metrics: HashMap<String, f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LearningExample {
    /// Mean of the example's metrics, 0 when it has none
    pub fn mean_performance(&self) -> f64 {
        if self.performance_metrics.is_empty() {
            return 0.0;
        }
        self.performance_metrics.values().sum::<f64>() / self.performance_metrics.len() as f64
    }
}

/// Aggregate performance over all stored examples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub average_performance: f64,
    pub improvement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessfulPatterns {
    pub count: usize,
    /// Most frequent tags among examples above the threshold, highest first
    pub common_tags: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptationMetrics {
    pub performance_threshold: f64,
    pub adaptation_rate: f64,
}

/// Summary of learning progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInsights {
    pub performance_stats: PerformanceStats,
    pub successful_patterns: SuccessfulPatterns,
    pub adaptation_metrics: AdaptationMetrics,
}

/// Example store with an adaptive performance threshold
#[derive(Debug)]
pub struct LearningStore {
    examples: Vec<LearningExample>,
    path: Option<PathBuf>,
    performance_threshold: f64,
    adaptation_rate: f64,
}

impl LearningStore {
    /// Create an in-memory store
    pub fn new() -> Self {
        Self {
            examples: Vec::new(),
            path: None,
            performance_threshold: INITIAL_PERFORMANCE_THRESHOLD,
            adaptation_rate: ADAPTATION_RATE,
        }
    }

    /// Open a store persisted under `dir`, loading existing examples
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(EXAMPLES_FILE);

        let examples = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Vec::new()
        };

        debug!(path = %path.display(), examples = examples.len(), "Opened learning store");

        Ok(Self {
            examples,
            path: Some(path),
            ..Self::new()
        })
    }

    pub fn examples(&self) -> &[LearningExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn performance_threshold(&self) -> f64 {
        self.performance_threshold
    }

    /// Append an example, persist the store and adapt the threshold
    pub fn add_example(
        &mut self,
        input_data: serde_json::Map<String, serde_json::Value>,
        output_data: serde_json::Value,
        performance_metrics: HashMap<String, f64>,
        tags: Vec<String>,
    ) -> Result<()> {
        let example = LearningExample {
            input_data,
            output_data,
            performance_metrics,
            timestamp: Utc::now(),
            tags,
        };
        let mean = example.mean_performance();
        self.examples.push(example);
        self.save()?;

        if mean > self.performance_threshold {
            self.performance_threshold =
                (1.0 - self.adaptation_rate) * self.performance_threshold + self.adaptation_rate * mean;
            debug!(
                threshold = self.performance_threshold,
                "Raised performance threshold"
            );
        }
        Ok(())
    }

    /// The `top_k` examples most similar to `query`, best first
    pub fn find_similar(
        &self,
        query: &serde_json::Map<String, serde_json::Value>,
        top_k: usize,
    ) -> Vec<(&LearningExample, f64)> {
        let mut scored: Vec<(&LearningExample, f64)> = self
            .examples
            .iter()
            .map(|e| (e, similarity(query, &e.input_data)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        let performances: Vec<f64> = self
            .examples
            .iter()
            .map(LearningExample::mean_performance)
            .collect();

        let (Some(first), Some(last)) = (performances.first(), performances.last()) else {
            return PerformanceStats::default();
        };

        let n = performances.len() as f64;
        let improvement_rate = if performances.len() > 1 {
            (last - first) / n
        } else {
            0.0
        };

        PerformanceStats {
            average_performance: performances.iter().sum::<f64>() / n,
            improvement_rate,
        }
    }

    /// Learning progress summary, `None` for an empty store
    pub fn insights(&self) -> Option<LearningInsights> {
        if self.examples.is_empty() {
            return None;
        }

        let successful: Vec<&LearningExample> = self
            .examples
            .iter()
            .filter(|e| e.mean_performance() > self.performance_threshold)
            .collect();

        let mut tag_counts: HashMap<&str, usize> = HashMap::new();
        for tag in successful.iter().flat_map(|e| e.tags.iter()) {
            *tag_counts.entry(tag.as_str()).or_default() += 1;
        }
        let mut common_tags: Vec<(String, usize)> = tag_counts
            .into_iter()
            .map(|(tag, count)| (tag.to_string(), count))
            .collect();
        common_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        common_tags.truncate(TOP_TAGS);

        Some(LearningInsights {
            performance_stats: self.performance_stats(),
            successful_patterns: SuccessfulPatterns {
                count: successful.len(),
                common_tags,
            },
            adaptation_metrics: AdaptationMetrics {
                performance_threshold: self.performance_threshold,
                adaptation_rate: self.adaptation_rate,
            },
        })
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = serde_json::to_string_pretty(&self.examples)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of shared keys whose values are equal
fn similarity(
    query: &serde_json::Map<String, serde_json::Value>,
    input: &serde_json::Map<String, serde_json::Value>,
) -> f64 {
    let shared: Vec<&String> = query.keys().filter(|k| input.contains_key(*k)).collect();
    if shared.is_empty() {
        return 0.0;
    }
    let equal = shared.iter().filter(|k| query.get(**k) == input.get(**k)).count();
    equal as f64 / shared.len() as f64
}
