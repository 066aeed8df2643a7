use archpilot_core::{
    ArchError, Inference, InferenceRequest, PromptLibrary, Result, RetryConfig, execute_with_retry,
    is_retryable_inference_error, is_retryable_status_code,
};
use async_trait::async_trait;
use serde::Deserialize;

/// Configuration for an OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct HostedInferenceConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl HostedInferenceConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 4000,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Inference client for any OpenAI-compatible chat endpoint.
///
/// Renders the named prompt template through a [`PromptLibrary`] and sends the
/// result as a single user message. Retryable failures (rate limits,
/// timeouts, 5xx) are retried with the shared backoff policy.
pub struct HostedInference {
    client: reqwest::Client,
    config: HostedInferenceConfig,
    prompts: PromptLibrary,
    retry: RetryConfig,
}

impl HostedInference {
    pub fn new(config: HostedInferenceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            prompts: PromptLibrary::new(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, prompt: &str, temperature: Option<f32>) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature.unwrap_or(0.3),
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ArchError::Inference(e.to_string()))?;

        let status = response.status().as_u16();
        if is_retryable_status_code(status) {
            let text = response.text().await.unwrap_or_default();
            return Err(ArchError::Inference(format!("HTTP {status}: {text}")));
        }
        if status >= 400 {
            let text = response.text().await.unwrap_or_default();
            return Err(ArchError::Inference(format!(
                "inference endpoint rejected request ({status}): {text}"
            )));
        }

        let completion: ChatCompletion =
            response.json().await.map_err(|e| ArchError::Inference(e.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ArchError::Inference("completion contained no choices".into()))
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Inference for HostedInference {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, req: InferenceRequest) -> Result<String> {
        let prompt = self.prompts.render(&req.template_id, &req.variables)?;
        tracing::debug!(
            template_id = %req.template_id,
            prompt_chars = prompt.len(),
            "dispatching inference request"
        );

        execute_with_retry(&self.retry, is_retryable_inference_error, || {
            let prompt = prompt.clone();
            async move { self.complete(&prompt, req.temperature).await }
        })
        .await
    }
}
