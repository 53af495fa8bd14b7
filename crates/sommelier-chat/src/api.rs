//! HTTP language model client for Ollama and OpenAI-compatible servers.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use sommelier_types::{ChatbotSettings, Provider};

use crate::model::{LanguageModel, LlmError};

/// Configuration for [`ApiModel`].
#[derive(Debug, Clone)]
pub struct ApiModelConfig {
    pub provider: Provider,

    /// API base URL (e.g., "http://localhost:11434", "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "llama3.1", "gpt-4o-mini")
    pub model: String,

    /// Bearer token, only sent to OpenAI-compatible servers
    pub api_key: Option<SecretString>,

    /// Timeout for one HTTP attempt
    pub timeout: Duration,

    /// Total time the retry loop may spend on one call
    pub max_elapsed: Duration,

    /// Maximum attempts per call
    pub max_retries: u32,

    /// First retry delay
    pub initial_backoff: Duration,
}

impl ApiModelConfig {
    /// Config for a local Ollama server.
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: Provider::Ollama,
            base_url: Provider::Ollama.default_base_url().to_string(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(40),
            max_elapsed: Duration::from_secs(120),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }

    /// Config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: Provider::OpenAi,
            base_url: Provider::OpenAi.default_base_url().to_string(),
            api_key: Some(SecretString::from(api_key.into())),
            ..Self::ollama(model)
        }
    }

    pub fn from_settings(settings: &ChatbotSettings) -> Self {
        Self {
            provider: settings.provider,
            base_url: settings.base_url(),
            model: settings.llm_model.clone(),
            api_key: settings.api_key.clone().map(SecretString::from),
            timeout: Duration::from_millis(settings.request_timeout_ms),
            max_elapsed: Duration::from_millis(settings.model_timeout_ms),
            max_retries: settings.max_retries.max(1),
            initial_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-attempt timeout and overall retry budget.
    pub fn with_timeouts(mut self, request: Duration, total: Duration) -> Self {
        self.timeout = request;
        self.max_elapsed = total;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_backoff = initial_backoff;
        self
    }
}

/// Language model reached over HTTP.
pub struct ApiModel {
    client: Client,
    config: ApiModelConfig,
}

impl ApiModel {
    pub fn new(config: ApiModelConfig) -> Result<Self, LlmError> {
        if config.model.trim().is_empty() {
            return Err(LlmError::Config("model name is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Call the API with retry logic.
    async fn call_api(&self, prompt: &str) -> Result<String, LlmError> {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_elapsed_time: Some(self.config.max_elapsed),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, model = %self.config.model, "Calling model API");

            let result = match self.config.provider {
                Provider::Ollama => self.make_ollama_request(prompt).await,
                Provider::OpenAi => self.make_openai_request(prompt).await,
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, attempts, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let response = request.send().await.map_err(request_error)?;

        if response.status() == 429 {
            return Err(LlmError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        Ok(response)
    }

    /// Ollama `/api/generate`, non-streaming.
    async fn make_ollama_request(&self, prompt: &str) -> Result<String, LlmError> {
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

        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };

        let response = self
            .send(self.client.post(self.url("api/generate")).json(&request))
            .await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(body.response)
    }

    /// OpenAI-compatible `/chat/completions`.
    async fn make_openai_request(&self, prompt: &str) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            messages: Vec<OpenAIMessage<'a>>,
        }

        #[derive(Serialize)]
        struct OpenAIMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: String,
        }

        let request = OpenAIRequest {
            model: &self.config.model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut builder = self
            .client
            .post(self.url("chat/completions"))
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = self.send(builder).await?;
        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))
    }
}

fn request_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Api(e.to_string())
    }
}

#[async_trait]
impl LanguageModel for ApiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let answer = self.call_api(prompt).await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_config() {
        let config = ApiModelConfig::ollama("llama3.1");
        assert_eq!(config.base_url, "http://localhost:11434");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_openai_config() {
        let config = ApiModelConfig::openai("test-key", "gpt-4o-mini");
        assert!(config.base_url.contains("openai"));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.provider, Provider::OpenAi);
    }

    #[test]
    fn test_from_settings() {
        let settings = ChatbotSettings::default();
        let config = ApiModelConfig::from_settings(&settings);
        assert_eq!(config.model, "llama3.1");
        assert_eq!(config.timeout, Duration::from_millis(40_000));
        assert_eq!(config.max_elapsed, Duration::from_millis(120_000));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_url_join() {
        let config = ApiModelConfig::ollama("m").with_base_url("http://h:1/");
        let model = ApiModel::new(config).unwrap();
        assert_eq!(model.url("api/generate"), "http://h:1/api/generate");
    }

    #[test]
    fn test_empty_model_rejected() {
        assert!(matches!(
            ApiModel::new(ApiModelConfig::ollama(" ")),
            Err(LlmError::Config(_))
        ));
    }
}
