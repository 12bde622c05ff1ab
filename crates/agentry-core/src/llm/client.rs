//! OpenAI-compatible LLM client implementation
//!
//! Provides an async HTTP client for `/chat/completions` endpoints (Groq by
//! default) with:
//! - Model parameters from [`LlmConfig`] (temperature, max tokens, top-p)
//! - Request timeout
//! - Status-code mapping into [`Error`]
//! - Optional cost logging

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::cost::CostMonitor;
use crate::error::{Error, Result};

use super::model::{GenerateFuture, LanguageModel};
use super::types::{ChatRequest, ChatResponse, Generation, Message};

/// Seconds to wait when a 429 response carries no retry hint
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client for chat completions
///
/// Cheap to clone; clones share the connection pool and cost monitor.
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
    cost_monitor: Option<Arc<CostMonitor>>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .field("cost_monitor", &self.cost_monitor.is_some())
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    cost_monitor: Option<Arc<CostMonitor>>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the LLM configuration
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the base URL from the configuration
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn cost_monitor(mut self, monitor: Arc<CostMonitor>) -> Self {
        self.cost_monitor = Some(monitor);
        self
    }

    /// Override the request timeout from the configuration
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::LLMError("API key is required".to_string()))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.base_url.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(LlmClient {
            http_client,
            config,
            api_key,
            base_url,
            cost_monitor: self.cost_monitor,
        })
    }
}

impl LlmClient {
    /// Create a new LlmClient with the given configuration and API key
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new().config(config).api_key(api_key).build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    pub fn with_cost_monitor(mut self, monitor: Arc<CostMonitor>) -> Self {
        self.cost_monitor = Some(monitor);
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the request sent for a message list
    pub fn build_request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest::new(&self.config.model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_top_p(self.config.top_p)
    }

    /// Make a chat completion request
    pub async fn complete(&self, messages: Vec<Message>) -> Result<Generation> {
        let request = self.build_request(messages);
        let result = self.send_request(&request).await;
        self.record_cost(&request.model, &result).await;
        result
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<Generation> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status.as_u16(), &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        Generation::from_chat_response(chat_response)
            .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))
    }

    /// Log the request on the cost monitor, off the async executor
    async fn record_cost(&self, model: &str, result: &Result<Generation>) {
        let Some(monitor) = &self.cost_monitor else {
            return;
        };

        let (input_tokens, output_tokens, error) = match result {
            Ok(generation) => (generation.input_tokens, generation.output_tokens, None),
            Err(e) => (0, 0, Some(e.to_string())),
        };
        let monitor = Arc::clone(monitor);
        let logged_model = model.to_string();
        let logged = tokio::task::spawn_blocking(move || {
            monitor.log_request(
                &logged_model,
                input_tokens,
                output_tokens,
                error.is_none(),
                error.as_deref(),
            )
        })
        .await;

        match logged {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(model = %model, error = %e, "Skipping cost record"),
            Err(e) => warn!(model = %model, error = %e, "Cost logging task failed"),
        }
    }
}

impl LanguageModel for LlmClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            let generation = self.complete(vec![Message::user(prompt)]).await?;
            debug!(
                model = %generation.model,
                tokens = generation.tokens_used(),
                "Received completion"
            );
            Ok(generation)
        })
    }
}

/// Map a non-success HTTP status to an error
fn map_error_status(status: u16, body: &str) -> Error {
    match status {
        401 => Error::LLMError(
            "Unauthorized: Invalid API key. Set AGENTRY_API_KEY or GROQ_API_KEY environment variable."
                .to_string(),
        ),
        429 => Error::RateLimited(extract_retry_after(body).unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
        400 => Error::LLMError(format!("Bad request: {}", body)),
        403 => Error::LLMError(format!("Forbidden: {}", body)),
        404 => Error::LLMError(format!("Model not found or endpoint unavailable: {}", body)),
        500..=599 => Error::LLMError(format!("Server error ({}): {}", status, body)),
        _ => Error::LLMError(format!("HTTP error {}: {}", status, body)),
    }
}

/// Extract retry-after value from error response
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    if let Some(retry_after) = json.get("retry_after").and_then(|v| v.as_u64()) {
        return Some(retry_after);
    }
    json.get("error")
        .and_then(|e| e.get("retry_after"))
        .and_then(|v| v.as_u64())
}
