//! Error types for Agentry

use thiserror::Error;

/// Result type alias using Agentry's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Agentry error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Task errors (E001-E099)
    /// A required task field is missing or empty. The payload is the field name.
    #[error("{0} is required")]
    Validation(String),

    #[error("Task timed out after {0} seconds")]
    Timeout(u64),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    LLMError(String),

    #[error("Rate limited. Retry after {0} seconds.")]
    RateLimited(u64),

    // Cost errors (E200-E299)
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Storage errors (E400-E499)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E001",
            Self::Timeout(_) => "E002",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::UnknownModel(_) => "E200",
            Self::Serialization(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Validation(field) => Some(format!("Provide a non-empty `{}`", field)),
            Self::Timeout(_) => Some("agentry config set coordinator.deadline_secs <secs>".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => {
                Some("Set AGENTRY_API_KEY or GROQ_API_KEY environment variable".to_string())
            }
            Self::RateLimited(secs) => Some(format!("Wait {} seconds and try again", secs)),
            Self::ConfigError(_) => Some("agentry config list".to_string()),
            _ => None,
        }
    }
}
