//! API cost monitoring
//!
//! This module provides:
//! - Token-based cost calculation from a per-model pricing table
//! - A request log with success/failure bookkeeping
//! - Optional JSON persistence of the log
//! - Per-model summaries for reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};

/// Pricing information for a model (per thousand tokens)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Model identifier
    pub model: String,
    /// Cost per thousand input tokens in USD
    pub input_per_1k: f64,
    /// Cost per thousand output tokens in USD
    pub output_per_1k: f64,
}

impl ModelPricing {
    /// Create new model pricing
    pub fn new(model: impl Into<String>, input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            model: model.into(),
            input_per_1k,
            output_per_1k,
        }
    }

    /// Calculate cost for the given token counts
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        let input_cost = (input_tokens as f64 / 1000.0) * self.input_per_1k;
        let output_cost = (output_tokens as f64 / 1000.0) * self.output_per_1k;
        input_cost + output_cost
    }
}

/// A single logged API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Persisted request log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostLog {
    pub total_cost: f64,
    pub requests: Vec<CostRecord>,
}

/// Aggregate usage for one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCostSummary {
    pub total_cost: f64,
    pub request_count: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

/// Summary of all logged usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub costs_by_model: BTreeMap<String, ModelCostSummary>,
}

/// Default pricing table, USD per thousand tokens
fn default_pricing_table() -> HashMap<String, ModelPricing> {
    [
        ModelPricing::new("llama-3.3-70b-versatile", 0.0007, 0.0007),
        ModelPricing::new("llama3-8b-8192", 0.0001, 0.0001),
    ]
    .into_iter()
    .map(|p| (p.model.clone(), p))
    .collect()
}

/// Records API usage and the cost it incurred
#[derive(Debug)]
pub struct CostMonitor {
    pricing: HashMap<String, ModelPricing>,
    log: RwLock<CostLog>,
    log_file: Option<PathBuf>,
}

impl CostMonitor {
    /// Create an in-memory monitor with default pricing
    pub fn new() -> Self {
        Self {
            pricing: default_pricing_table(),
            log: RwLock::new(CostLog::default()),
            log_file: None,
        }
    }

    /// Open a monitor backed by a JSON log file, loading it if present
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let log = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            CostLog::default()
        };

        Ok(Self {
            pricing: default_pricing_table(),
            log: RwLock::new(log),
            log_file: Some(path),
        })
    }

    /// Add custom model pricing
    pub fn add_pricing(&mut self, pricing: ModelPricing) {
        self.pricing.insert(pricing.model.clone(), pricing);
    }

    /// Get pricing for a model, returns None if unknown
    pub fn get_pricing(&self, model: &str) -> Option<&ModelPricing> {
        self.pricing.get(model)
    }

    /// Calculate the cost of a single request
    pub fn calculate_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> Result<f64> {
        self.pricing
            .get(model)
            .map(|p| p.calculate_cost(input_tokens, output_tokens))
            .ok_or_else(|| Error::UnknownModel(model.to_string()))
    }

    /// Log a request with its cost and outcome
    pub fn log_request(
        &self,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
        success: bool,
        error: Option<&str>,
    ) -> Result<CostRecord> {
        let cost = self.calculate_cost(model, input_tokens, output_tokens)?;

        let record = CostRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost,
            success,
            error: error.map(str::to_string),
        };

        let snapshot = {
            let mut log = self
                .log
                .write()
                .map_err(|_| Error::Other("cost log lock poisoned".to_string()))?;
            log.requests.push(record.clone());
            log.total_cost += cost;
            self.log_file.as_ref().map(|_| log.clone())
        };

        if let (Some(path), Some(log)) = (&self.log_file, snapshot) {
            save_log(path, &log)?;
        }

        Ok(record)
    }

    /// Total cost of all logged requests
    pub fn total_cost(&self) -> f64 {
        self.log.read().map(|l| l.total_cost).unwrap_or(0.0)
    }

    /// All logged requests, oldest first
    pub fn records(&self) -> Vec<CostRecord> {
        self.log
            .read()
            .map(|l| l.requests.clone())
            .unwrap_or_default()
    }

    /// Summary of usage and costs
    pub fn summary(&self) -> CostSummary {
        let log = self.log.read().map(|l| l.clone()).unwrap_or_default();

        let mut costs_by_model: BTreeMap<String, ModelCostSummary> = BTreeMap::new();
        for record in &log.requests {
            let entry = costs_by_model.entry(record.model.clone()).or_default();
            entry.total_cost += record.cost;
            entry.request_count += 1;
            entry.total_input_tokens += record.input_tokens as u64;
            entry.total_output_tokens += record.output_tokens as u64;
        }

        let successful_requests = log.requests.iter().filter(|r| r.success).count();

        CostSummary {
            total_cost: log.total_cost,
            total_requests: log.requests.len(),
            successful_requests,
            failed_requests: log.requests.len() - successful_requests,
            costs_by_model,
        }
    }
}

impl Default for CostMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn save_log(path: &Path, log: &CostLog) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(log)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_pricing_calculation() {
        let pricing = ModelPricing::new("test-model", 0.5, 1.5);
        let cost = pricing.calculate_cost(2000, 1000);
        assert!((cost - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_cost_unknown_model() {
        let monitor = CostMonitor::new();
        let err = monitor.calculate_cost("mystery", 10, 10).unwrap_err();
        assert!(matches!(err, Error::UnknownModel(m) if m == "mystery"));
    }

    #[test]
    fn test_log_request_accumulates() {
        let monitor = CostMonitor::new();
        monitor
            .log_request("llama-3.3-70b-versatile", 1000, 1000, true, None)
            .unwrap();
        monitor
            .log_request("llama3-8b-8192", 2000, 0, false, Some("rate limited"))
            .unwrap();

        assert!((monitor.total_cost() - (0.0014 + 0.0002)).abs() < 1e-9);

        let summary = monitor.summary();
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.successful_requests, 1);
        assert_eq!(summary.failed_requests, 1);

        let big = &summary.costs_by_model["llama-3.3-70b-versatile"];
        assert_eq!(big.request_count, 1);
        assert_eq!(big.total_input_tokens, 1000);
        assert_eq!(big.total_output_tokens, 1000);

        let records = monitor.records();
        assert_eq!(records[1].error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_unknown_model_is_not_logged() {
        let monitor = CostMonitor::new();
        assert!(monitor.log_request("mystery", 1, 1, true, None).is_err());
        assert_eq!(monitor.summary().total_requests, 0);
    }

    #[test]
    fn test_custom_pricing() {
        let mut monitor = CostMonitor::new();
        monitor.add_pricing(ModelPricing::new("custom/model", 1.0, 2.0));
        assert!(monitor.get_pricing("custom/model").is_some());
        let cost = monitor.calculate_cost("custom/model", 1000, 1000).unwrap();
        assert!((cost - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("costs").join("api_costs.json");

        {
            let monitor = CostMonitor::open(&path).unwrap();
            monitor
                .log_request("llama3-8b-8192", 1000, 1000, true, None)
                .unwrap();
        }

        assert!(path.exists());
        let reopened = CostMonitor::open(&path).unwrap();
        assert_eq!(reopened.records().len(), 1);
        assert!((reopened.total_cost() - 0.0002).abs() < 1e-9);
    }
}
