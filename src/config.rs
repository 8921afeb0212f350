//! Configuration types for PDF classification.
//!
//! All classification behaviour is controlled through [`ClassifierConfig`],
//! built via its [`ClassifierConfigBuilder`]. The config is passed explicitly
//! into the orchestrator; nothing reads process-wide globals, so tests can
//! point a classifier at a mock endpoint without touching the environment.

use crate::error::ClassifyError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Endpoint used when neither the config nor `OLLAMA_HOST` names one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/v1";

/// Environment variable that overrides the inference endpoint.
pub const ENDPOINT_ENV: &str = "OLLAMA_HOST";

/// Default model for text-only classification.
pub const DEFAULT_TEXT_MODEL: &str = "qwen2.5-coder:7b";

/// Default model for hybrid (vision + text) classification.
pub const DEFAULT_VISION_MODEL: &str = "llama3.2-vision";

/// Which extraction/prompt strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Sampled text from the first, second and last pages. (default)
    #[default]
    TextOnly,
    /// Page-1 raster image plus page-1 text in one multimodal call.
    Hybrid,
}

impl ClassificationMode {
    pub fn default_model(self) -> &'static str {
        match self {
            ClassificationMode::TextOnly => DEFAULT_TEXT_MODEL,
            ClassificationMode::Hybrid => DEFAULT_VISION_MODEL,
        }
    }

    /// Sampling temperature used when the config does not set one.
    ///
    /// Text-only runs fully greedy; the vision model gets a little slack
    /// because some vision backends reject a temperature of exactly zero.
    pub fn default_temperature(self) -> f32 {
        match self {
            ClassificationMode::TextOnly => 0.0,
            ClassificationMode::Hybrid => 0.1,
        }
    }

    /// Seed used when the config does not set one. Only text-only sends a seed.
    pub fn default_seed(self) -> Option<u64> {
        match self {
            ClassificationMode::TextOnly => Some(42),
            ClassificationMode::Hybrid => None,
        }
    }
}

/// Configuration for a classification run.
///
/// Built via [`ClassifierConfig::builder()`] or using
/// [`ClassifierConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfclassify::{ClassificationMode, ClassifierConfig};
///
/// let config = ClassifierConfig::builder()
///     .mode(ClassificationMode::Hybrid)
///     .dpi(150)
///     .endpoint("http://localhost:11434/v1")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ClassifierConfig {
    /// Extraction and prompt strategy. Default: [`ClassificationMode::TextOnly`].
    pub mode: ClassificationMode,

    /// Model identifier. If None, uses [`ClassificationMode::default_model`].
    pub model: Option<String>,

    /// OpenAI-compatible base URL (e.g. `http://localhost:11434/v1`).
    /// If None, `OLLAMA_HOST` is consulted, then [`DEFAULT_ENDPOINT`].
    pub endpoint: Option<String>,

    /// Bearer token for the endpoint. Ollama ignores it. Default: None (`"ollama"` is sent).
    pub api_key: Option<String>,

    /// `edgequake-llm` provider name (e.g. "openai", "anthropic").
    /// When set, requests go through that provider instead of `endpoint`.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Rendering DPI for the hybrid page image. Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps typed text legible to a vision model while the JPEG stays
    /// small enough for local models to ingest quickly.
    pub dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Character budget of the text-only excerpt. Default: 4000.
    pub max_chars: usize,

    /// Character budget of the page-1 text sent alongside the hybrid image. Default: 2000.
    pub hybrid_text_chars: usize,

    /// Characters taken from page 2 in text-only mode. Default: 500.
    pub second_page_chars: usize,

    /// Text-only excerpts shorter than this are treated as scans. Default: 50.
    pub min_text_chars: usize,

    /// Sampling temperature. If None, uses [`ClassificationMode::default_temperature`].
    pub temperature: Option<f32>,

    /// Sampling seed. If None, uses [`ClassificationMode::default_seed`].
    pub seed: Option<u64>,

    /// Maximum tokens the model may generate. Default: 300.
    ///
    /// The expected answer is a three-field JSON object; 300 tokens leaves room
    /// for a verbose evidence string without letting a rambling model run on.
    pub max_tokens: usize,

    /// Retry attempts on a transient inference failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-inference-call timeout in seconds. Default: 120.
    ///
    /// Local vision models on CPU can take well over a minute per page.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: ClassificationMode::default(),
            model: None,
            endpoint: None,
            api_key: None,
            provider_name: None,
            provider: None,
            dpi: 150,
            max_rendered_pixels: 2000,
            max_chars: 4000,
            hybrid_text_chars: 2000,
            second_page_chars: 500,
            min_text_chars: 50,
            temperature: None,
            seed: None,
            max_tokens: 300,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("mode", &self.mode)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_chars", &self.max_chars)
            .field("hybrid_text_chars", &self.hybrid_text_chars)
            .field("second_page_chars", &self.second_page_chars)
            .field("min_text_chars", &self.min_text_chars)
            .field("temperature", &self.temperature)
            .field("seed", &self.seed)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl ClassifierConfig {
    /// Create a new builder for `ClassifierConfig`.
    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model to request, falling back to the mode's default.
    pub fn resolved_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.mode.default_model())
    }

    /// The endpoint base URL: config, then `OLLAMA_HOST`, then [`DEFAULT_ENDPOINT`].
    pub fn resolved_endpoint(&self) -> String {
        if let Some(ref url) = self.endpoint {
            return url.clone();
        }
        match std::env::var(ENDPOINT_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn resolved_temperature(&self) -> f32 {
        self.temperature
            .unwrap_or_else(|| self.mode.default_temperature())
    }

    pub fn resolved_seed(&self) -> Option<u64> {
        self.seed.or_else(|| self.mode.default_seed())
    }
}

/// Builder for [`ClassifierConfig`].
pub struct ClassifierConfigBuilder {
    config: ClassifierConfig,
}

impl fmt::Debug for ClassifierConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ClassifierConfigBuilder {
    pub fn mode(mut self, mode: ClassificationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_chars(mut self, n: usize) -> Self {
        self.config.max_chars = n;
        self
    }

    pub fn hybrid_text_chars(mut self, n: usize) -> Self {
        self.config.hybrid_text_chars = n;
        self
    }

    pub fn second_page_chars(mut self, n: usize) -> Self {
        self.config.second_page_chars = n;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClassifierConfig, ClassifyError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(ClassifyError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.max_chars == 0 || c.hybrid_text_chars == 0 {
            return Err(ClassifyError::InvalidConfig(
                "Excerpt budgets must be ≥ 1 character".into(),
            ));
        }
        if c.min_text_chars > c.max_chars {
            return Err(ClassifyError::InvalidConfig(format!(
                "Minimum text length ({}) exceeds the excerpt budget ({})",
                c.min_text_chars, c.max_chars
            )));
        }
        if c.max_tokens == 0 {
            return Err(ClassifyError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ClassifyError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
