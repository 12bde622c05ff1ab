//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Agentry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub research: PhaseConfig,
    pub planning: PhaseConfig,
    pub coordinator: CoordinatorConfig,
    pub cost: CostConfig,
    /// Carried for tooling; the pipeline does not branch on it
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Never written; present only when a file carries one, which fails validation
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub top_p: f32,
    pub timeout_secs: u64,
}

/// Per-phase settings for an agent role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Retry budget reserved for a retrying coordinator; not consumed today
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Reflection flags outcomes below this confidence
    pub confidence_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Shared deadline for a fan-out run
    pub deadline_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostConfig {
    /// JSON file the cost monitor persists to; in-memory only when unset
    pub log_file: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            top_p: 0.95,
            timeout_secs: 45,
        }
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout_secs: 45,
            confidence_threshold: 0.7,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { deadline_secs: 90 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            research: PhaseConfig::default(),
            planning: PhaseConfig::default(),
            coordinator: CoordinatorConfig::default(),
            cost: CostConfig::default(),
            debug: false,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("AGENTRY_API_KEY")
            .or_else(|_| env::var("GROQ_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty()))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

fn redact(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        "***".to_string()
    } else {
        let tail: String = key.chars().skip(count - 4).collect();
        format!("***{}", tail)
    }
}

const KEYS: &[&str] = &[
    "llm.base_url",
    "llm.model",
    "llm.temperature",
    "llm.max_tokens",
    "llm.top_p",
    "llm.timeout_secs",
    "llm.api_key",
    "research.max_retries",
    "research.timeout_secs",
    "research.confidence_threshold",
    "planning.max_retries",
    "planning.timeout_secs",
    "planning.confidence_threshold",
    "coordinator.deadline_secs",
    "cost.log_file",
    "debug",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("AGENTRY_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("agentry")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(anyhow!("top_p must be between 0.0 and 1.0"));
        }
        for (name, phase) in [("research", &self.research), ("planning", &self.planning)] {
            if !(0.0..=1.0).contains(&phase.confidence_threshold) {
                return Err(anyhow!(
                    "{}.confidence_threshold must be between 0.0 and 1.0",
                    name
                ));
            }
        }
        if self.coordinator.deadline_secs == 0 {
            return Err(anyhow!("coordinator.deadline_secs must be greater than zero"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.model" => Ok(self.llm.model.clone()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.top_p" => Ok(self.llm.top_p.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            "research.max_retries" => Ok(self.research.max_retries.to_string()),
            "research.timeout_secs" => Ok(self.research.timeout_secs.to_string()),
            "research.confidence_threshold" => Ok(self.research.confidence_threshold.to_string()),
            "planning.max_retries" => Ok(self.planning.max_retries.to_string()),
            "planning.timeout_secs" => Ok(self.planning.timeout_secs.to_string()),
            "planning.confidence_threshold" => Ok(self.planning.confidence_threshold.to_string()),

            "coordinator.deadline_secs" => Ok(self.coordinator.deadline_secs.to_string()),

            "cost.log_file" => Ok(self
                .cost
                .log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(not set)".to_string())),

            "debug" => Ok(self.debug.to_string()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => {
                    Ok("(not set - use AGENTRY_API_KEY or GROQ_API_KEY env var)".to_string())
                }
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `agentry config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.base_url" => {
                self.llm.base_url = value.trim_end_matches('/').to_string();
            }
            "llm.model" => {
                self.llm.model = value.to_string();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.top_p" => {
                let top_p: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid top_p value: {}", value))?;
                if !(0.0..=1.0).contains(&top_p) {
                    return Err(anyhow!("top_p must be between 0.0 and 1.0"));
                }
                self.llm.top_p = top_p;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            "research.max_retries" | "planning.max_retries" => {
                let retries: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_retries value: {}", value))?;
                self.phase_mut(key).max_retries = retries;
            }
            "research.timeout_secs" | "planning.timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
                self.phase_mut(key).timeout_secs = secs;
            }
            "research.confidence_threshold" | "planning.confidence_threshold" => {
                let threshold: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid confidence_threshold value: {}", value))?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(anyhow!("Confidence threshold must be between 0.0 and 1.0"));
                }
                self.phase_mut(key).confidence_threshold = threshold;
            }

            "coordinator.deadline_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid deadline_secs value: {}", value))?;
                if secs == 0 {
                    return Err(anyhow!("Deadline must be greater than zero"));
                }
                self.coordinator.deadline_secs = secs;
            }

            "cost.log_file" => {
                self.cost.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }

            "debug" => {
                self.debug = value
                    .parse()
                    .with_context(|| format!("Invalid debug value: {}", value))?;
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the AGENTRY_API_KEY or GROQ_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `agentry config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    fn phase_mut(&mut self, key: &str) -> &mut PhaseConfig {
        if key.starts_with("planning.") {
            &mut self.planning
        } else {
            &mut self.research
        }
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
