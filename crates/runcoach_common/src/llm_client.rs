//! Analysis Provider - text generation boundary
//!
//! Sends a single-turn prompt to an OpenAI-compatible chat completions
//! endpoint and returns the generated coaching text. The orchestrator only
//! sees the `AnalysisProvider` trait, so tests and offline runs can swap in
//! `FakeAnalysisProvider`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Analysis provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.groq.com/openai".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Analysis errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis is disabled in configuration")]
    Disabled,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("provider returned empty content")]
    EmptyResponse,
}

/// Produces analysis text from a prompt.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn generate_analysis(&self, prompt: &str) -> Result<String, AnalysisError>;
}

/// Real provider over HTTP
pub struct HttpAnalysisProvider {
    config: AnalysisConfig,
    client: reqwest::Client,
}

impl HttpAnalysisProvider {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout(self.config.timeout_secs)
        } else {
            AnalysisError::HttpError(format!("Request failed: {}", e))
        }
    }
}

#[async_trait]
impl AnalysisProvider for HttpAnalysisProvider {
    async fn generate_analysis(&self, prompt: &str) -> Result<String, AnalysisError> {
        if !self.config.enabled {
            return Err(AnalysisError::Disabled);
        }

        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": prompt},
            ],
        });

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!("Requesting analysis from {} (model {})", url, self.config.model);
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(AnalysisError::HttpError(format!(
                "HTTP {} from analysis provider",
                response.status()
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidJson(format!("Failed to parse response: {}", e)))?;

        let text = response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .ok_or(AnalysisError::EmptyResponse)?;

        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        Ok(text.to_string())
    }
}

/// Fake provider for tests and offline runs
pub struct FakeAnalysisProvider {
    responses: Mutex<Vec<Result<String, AnalysisError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeAnalysisProvider {
    /// Create a fake provider with scripted responses. The last response
    /// repeats once the others are used up.
    pub fn new(responses: Vec<Result<String, AnalysisError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    pub fn always_error(error: AnalysisError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AnalysisProvider for FakeAnalysisProvider {
    async fn generate_analysis(&self, prompt: &str) -> Result<String, AnalysisError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        match responses.len() {
            0 => Err(AnalysisError::EmptyResponse),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}
