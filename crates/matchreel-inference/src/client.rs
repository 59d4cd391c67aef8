//! Gemini HTTP client.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use tracing::{info, warn};

use crate::error::{InferenceError, InferenceResult};
use crate::logging::{log_api_request, log_api_response, truncate};
use crate::types::{Blob, Content, GenerateContentRequest, GenerateContentResponse, Part};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Submit media plus an instruction to a multimodal model and get text back.
#[async_trait]
pub trait VisionInference: Send + Sync {
    async fn infer(&self, media: &[u8], mime_type: &str, instruction: &str)
        -> InferenceResult<String>;
}

/// Configuration for the Gemini client.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Model tried first
    pub model: String,
    /// Models tried in order when the primary model fails
    pub fallback_models: Vec<String>,
    pub base_url: String,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Retries per model on retryable errors
    pub max_retries: u32,
    /// First retry delay; doubles on each further attempt
    pub retry_base_delay: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            fallback_models: Vec::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(300), // video uploads are large
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("fallback_models", &self.fallback_models)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> InferenceResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .map_err(|_| InferenceError::config("GEMINI_API_KEY not set"))?;

        let defaults = Self::default();
        Ok(Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            fallback_models: std::env::var("GEMINI_FALLBACK_MODELS")
                .map(|s| parse_model_list(&s))
                .unwrap_or_default(),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("GEMINI_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: defaults.retry_base_delay,
        })
    }

    /// Primary model followed by the distinct fallbacks.
    pub fn models(&self) -> Vec<&str> {
        let mut models = vec![self.model.as_str()];
        for model in &self.fallback_models {
            if !models.contains(&model.as_str()) {
                models.push(model);
            }
        }
        models
    }
}

fn parse_model_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> InferenceResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(InferenceError::config("Gemini API key is empty"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(InferenceError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> InferenceResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// One `generateContent` call against `model`.
    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> InferenceResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::from_status(status, truncate(&body, 500)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let body: GenerateContentResponse = serde_json::from_str(&text)?;

        if let Some(reason) = body.block_reason() {
            warn!(model, reason, "Gemini blocked the prompt");
        }

        body.text()
            .ok_or_else(|| InferenceError::EmptyResponse(model.to_string()))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout(self.config.timeout.as_secs())
        } else {
            InferenceError::Network(e)
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> InferenceResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = InferenceResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.pow(attempt);
                    warn!(
                        "Inference request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl VisionInference for GeminiClient {
    async fn infer(
        &self,
        media: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> InferenceResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(media),
                        },
                    },
                    Part::Text {
                        text: instruction.to_string(),
                    },
                ],
            }],
        };

        let mut last_error = None;

        for model in self.config.models() {
            log_api_request(model, instruction, media.len());
            let started = Instant::now();

            match self.with_retry(|| self.generate(model, &request)).await {
                Ok(text) => {
                    log_api_response(model, &text, started.elapsed());
                    return Ok(text);
                }
                Err(e @ InferenceError::Auth { .. }) => {
                    // Same key for every model
                    return Err(e);
                }
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        info!("All configured Gemini models failed");
        Err(last_error.unwrap_or_else(|| InferenceError::config("No Gemini models configured")))
    }
}
