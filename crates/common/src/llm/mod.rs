//! Text-generation service abstraction
//!
//! The research producer talks to a local generation service through the
//! [`TextGenerator`] trait:
//! - Ollama (`/api/generate`, non-streaming)
//! - Scripted mock for tests and dry runs

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for prompt-in, text-out generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Ollama generation client
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
            max_retries: config.max_retries,
        })
    }

    async fn make_request(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::GenerationTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::HttpClient(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(AppError::ServiceUnavailable {
                message: format!("ollama at {} is not ready", self.base_url),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "ollama".to_string(),
                message: format!("{}: {}", status, body),
            });
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            AppError::Generation {
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        Ok(result.response)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let max_retries = self.max_retries;
        let mut attempt = 0u32;

        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };

        let result = retry(policy, || {
            attempt += 1;
            let current = attempt;
            async move {
                match self.make_request(prompt).await {
                    Ok(text) => Ok(text),
                    Err(e) if e.is_transient() && current <= max_retries => {
                        tracing::warn!(
                            attempt = current,
                            max_retries,
                            error = %e,
                            "Generation request failed, retrying"
                        );
                        Err(backoff::Error::transient(e))
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            }
        })
        .await;

        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted generator for tests
///
/// Returns the response of the first rule whose needle occurs in the prompt,
/// otherwise the fallback. Every prompt is recorded.
pub struct MockGenerator {
    rules: Vec<(String, std::result::Result<String, String>)>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Respond with `response` when the prompt contains `needle`
    pub fn respond_when(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Ok(response.into())));
        self
    }

    /// Fail with a generation error when the prompt contains `needle`
    pub fn fail_when(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Err(message.into())));
        self
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let rule = self.rules.iter().find(|(needle, _)| prompt.contains(needle.as_str()));
        match rule {
            Some((_, Ok(response))) => Ok(response.clone()),
            Some((_, Err(message))) => Err(AppError::Generation {
                message: message.clone(),
            }),
            None => Ok(self.fallback.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaClient::new(config)?)),
        "mock" => {
            tracing::warn!("Using mock text generator, no model will be called");
            Ok(Arc::new(MockGenerator::new("{}")))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown llm provider: {}", other),
        }),
    }
}
