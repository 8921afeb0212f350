//! Model interaction: send a [`ClassificationRequest`], get raw text back.
//!
//! [`InferenceClient`] is the seam between the orchestrator and whatever
//! serves the model. Two implementations ship:
//!
//! * [`HttpInferenceClient`] talks to any OpenAI-compatible
//!   `/chat/completions` endpoint directly (Ollama, vLLM, LM Studio). This is
//!   the default, and the only path that forwards a sampling `seed`.
//! * [`ProviderInferenceClient`] adapts an `edgequake-llm` [`LLMProvider`], so
//!   any hosted provider that crate supports can classify documents too.
//!
//! The client returns the model's text untouched. Parsing is the
//! normalizer's job, so a malformed answer is not an inference error.
//!
//! ## Retry Strategy
//!
//! Timeouts, connection failures, 429 and 5xx are retried with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`). With the 500 ms default and
//! 2 retries the wait sequence is 500 ms → 1 s. Everything else fails on the
//! first attempt: a wrong model name answers 404 every time.

use crate::config::ClassifierConfig;
use crate::error::{ClassifyError, InferenceError};
use crate::pipeline::strategy::ClassificationRequest;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// API key sent when none is configured. Ollama ignores it; the header must exist.
pub const DEFAULT_API_KEY: &str = "ollama";

/// Something that can answer a classification request.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Run one request and return the model's raw text.
    async fn infer(&self, request: &ClassificationRequest) -> Result<String, InferenceError>;
}

/// Build the client selected by `config`.
///
/// Resolution order: a pre-built provider, then a provider name through
/// [`ProviderFactory`], then a direct HTTP client for the resolved endpoint.
pub fn client_for(config: &ClassifierConfig) -> Result<Arc<dyn InferenceClient>, ClassifyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderInferenceClient::new(
            "provider",
            Arc::clone(provider),
            config.api_timeout_secs,
        )));
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, config.resolved_model())
            .map_err(|e| ClassifyError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            })?;
        return Ok(Arc::new(ProviderInferenceClient::new(
            name,
            provider,
            config.api_timeout_secs,
        )));
    }

    Ok(Arc::new(HttpInferenceClient::from_config(config)?))
}

/// Call `client`, retrying transient failures.
pub async fn infer_with_retry(
    client: &dyn InferenceClient,
    request: &ClassificationRequest,
    max_retries: u32,
    retry_backoff_ms: u64,
) -> Result<String, InferenceError> {
    let mut attempt = 0u32;
    loop {
        match client.infer(request).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let backoff = retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: attempt {} failed ({}); retry {}/{} after {}ms",
                    client.name(),
                    attempt,
                    e,
                    attempt,
                    max_retries,
                    backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// ── OpenAI-compatible HTTP ───────────────────────────────────────────────

/// Direct client for an OpenAI-compatible chat-completions endpoint.
pub struct HttpInferenceClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpInferenceClient {
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        Self::new(
            &config.resolved_endpoint(),
            config.resolved_model(),
            config.api_key.as_deref().unwrap_or(DEFAULT_API_KEY),
            config.api_timeout_secs,
        )
    }

    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, ClassifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClassifyError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: completions_url(endpoint),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn infer(&self, request: &ClassificationRequest) -> Result<String, InferenceError> {
        let body = ChatCompletionBody::new(&self.model, request);
        debug!(
            "POST {} model={} image={}",
            self.url,
            self.model,
            request.image.is_some()
        );

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| InferenceError::Provider(format!("undecodable completion: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }
}

impl HttpInferenceClient {
    fn map_reqwest_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            InferenceError::Transport(e.to_string())
        }
    }
}

fn completions_url(endpoint: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    stream: bool,
}

impl<'a> ChatCompletionBody<'a> {
    fn new(model: &'a str, request: &'a ClassificationRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(WireMessage {
                role: "system",
                content: WireContent::Text(system),
            });
        }

        let user = match request.image {
            Some(ref image) => WireContent::Parts(vec![
                WirePart::Text {
                    text: &request.prompt,
                },
                WirePart::ImageUrl {
                    image_url: WireImageUrl {
                        url: image.data_url(),
                    },
                },
            ]),
            None => WireContent::Text(&request.prompt),
        };
        messages.push(WireMessage {
            role: "user",
            content: user,
        });

        Self {
            model,
            messages,
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
            seed: request.options.seed,
            stream: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: WireContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent<'a> {
    Text(&'a str),
    Parts(Vec<WirePart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Serialize)]
struct WireImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── edgequake-llm provider ───────────────────────────────────────────────

/// Adapter over an `edgequake-llm` provider.
///
/// Providers take no seed, so `options.seed` is dropped on this path.
pub struct ProviderInferenceClient {
    name: String,
    provider: Arc<dyn LLMProvider>,
    timeout_secs: u64,
}

impl ProviderInferenceClient {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>, timeout_secs: u64) -> Self {
        Self {
            name: name.into(),
            provider,
            timeout_secs,
        }
    }

    fn messages(request: &ClassificationRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage::system(system.as_str()));
        }
        match request.image {
            Some(ref image) => messages.push(ChatMessage::user_with_images(
                request.prompt.as_str(),
                vec![image.to_image_data()],
            )),
            None => messages.push(ChatMessage::user(request.prompt.as_str())),
        }
        messages
    }
}

#[async_trait]
impl InferenceClient for ProviderInferenceClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn infer(&self, request: &ClassificationRequest) -> Result<String, InferenceError> {
        let messages = Self::messages(request);
        let options = CompletionOptions {
            temperature: Some(request.options.temperature),
            max_tokens: Some(request.options.max_tokens),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        .map_err(|_| InferenceError::Timeout {
            secs: self.timeout_secs,
        })?
        .map_err(|e| InferenceError::Provider(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name,
            response.prompt_tokens,
            response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(response.content)
    }
}
